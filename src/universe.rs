use core::fmt;
use std::collections::HashMap;

use glam::DVec3;
use thiserror::Error;

use crate::{Body, BodyId, Orbit, OrbitProvider};

/// Struct that represents the simulation of the universe.
#[derive(Clone, Debug, PartialEq)]
pub struct Universe {
    /// The celestial bodies in the universe and their relations.
    bodies: HashMap<BodyId, BodyWrapper>,

    /// The next ID to assign to a body.
    next_id: u64,

    /// The time elapsed in the universe, in seconds.
    pub time: f64,

    /// The time step of the simulation, in seconds.
    pub time_step: f64,

    /// The gravitational constant, in m^3 kg^-1 s^-2.
    pub g: f64,
}

/// The parent and satellites of a body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodyRelation {
    /// The body this one orbits, if any.
    pub parent: Option<BodyId>,
    /// The bodies orbiting this one.
    pub satellites: Vec<BodyId>,
}

#[derive(Clone, Debug, PartialEq)]
struct BodyWrapper {
    body: Body,
    relations: BodyRelation,
}

/// An error that can occur when adding a body to a [`Universe`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BodyAddError {
    /// The requested parent doesn't exist.
    #[error("there was no body with id {0}")]
    ParentNotFound(BodyId),
}

impl Universe {
    /// The gravitational constant used when none is given, in m^3 kg^-1 s^-2.
    pub const DEFAULT_G: f64 = 6.6743015e-11;

    /// The time step used when none is given, in seconds.
    pub const DEFAULT_TIME_STEP: f64 = 3.6e3;

    /// Creates an empty universe.
    pub fn new(time_step: Option<f64>, g: Option<f64>) -> Universe {
        Universe {
            bodies: HashMap::new(),
            next_id: 0,
            time: 0.0,
            time_step: time_step.unwrap_or(Self::DEFAULT_TIME_STEP),
            g: g.unwrap_or(Self::DEFAULT_G),
        }
    }

    /// Adds a body to the universe.
    ///
    /// `body`: The body to add into the universe.
    /// `satellite_of`: The body that this body is orbiting.
    ///
    /// Returns: The ID of the newly-added body, or the body back if the
    /// parent doesn't exist.
    pub fn add_body(
        &mut self,
        body: Body,
        satellite_of: Option<BodyId>,
    ) -> Result<BodyId, (BodyAddError, Body)> {
        if let Some(parent) = satellite_of {
            if !self.bodies.contains_key(&parent) {
                return Err((BodyAddError::ParentNotFound(parent), body));
            }
        }

        let id = BodyId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        self.bodies.insert(
            id,
            BodyWrapper {
                body,
                relations: BodyRelation {
                    parent: satellite_of,
                    satellites: Vec::new(),
                },
            },
        );
        if let Some(parent) = satellite_of {
            if let Some(wrapper) = self.bodies.get_mut(&parent) {
                wrapper.relations.satellites.push(id);
            }
        }

        Ok(id)
    }

    /// Removes a body from the universe.
    ///
    /// Returns: A Vec of all bodies that were removed, including the one
    /// specified and everything orbiting it.
    /// An empty Vec is returned if the body was not found.
    pub fn remove_body(&mut self, id: BodyId) -> Vec<Body> {
        let Some(wrapper) = self.bodies.remove(&id) else {
            return Vec::new();
        };

        let (body, relations) = (wrapper.body, wrapper.relations);
        let mut bodies = vec![body];

        if let Some(parent) = relations.parent {
            if let Some(parent_wrapper) = self.bodies.get_mut(&parent) {
                parent_wrapper
                    .relations
                    .satellites
                    .retain(|&satellite| satellite != id);
            }
        }

        for &satellite in &relations.satellites {
            bodies.append(&mut self.remove_body(satellite));
        }

        bodies
    }

    /// Gets all bodies in the universe along with their IDs.
    pub fn get_bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies.iter().map(|(&id, wrapper)| (id, &wrapper.body))
    }

    /// Gets the parent and satellites of a body.
    pub fn get_body_relation(&self, id: BodyId) -> Option<&BodyRelation> {
        self.bodies.get(&id).map(|wrapper| &wrapper.relations)
    }

    /// Gets a mutable reference to a body in the universe.
    pub fn get_body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(&id).map(|wrapper| &mut wrapper.body)
    }

    /// Gets an immutable reference to a body in the universe.
    pub fn get_body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(&id).map(|wrapper| &wrapper.body)
    }

    /// Gets the ID of a body with a given name.
    pub fn get_body_id_with_name(&self, name: &str) -> Option<BodyId> {
        self.bodies
            .iter()
            .find(|(_, w)| w.body.name == name)
            .map(|(id, _)| *id)
    }

    /// Advances the simulation by a tick.
    pub fn tick(&mut self) {
        self.time += self.time_step;
    }

    /// Advances the universe by multiple ticks.
    pub fn warp(&mut self, ticks: u128) {
        self.time += ticks as f64 * self.time_step;
    }

    /// Gets the absolute position of a body at the current time, in meters.
    ///
    /// The top ancestor of the body (i.e, the body with no parent) is at
    /// the origin.
    pub fn get_body_position(&self, id: BodyId) -> Option<DVec3> {
        let wrapper = self.bodies.get(&id)?;

        let mut position = match &wrapper.body.orbit {
            Some(orbit) => orbit.get_position(self.time).cartesian,
            None => DVec3::ZERO,
        };

        if let Some(parent) = wrapper.relations.parent {
            if let Some(parent_position) = self.get_body_position(parent) {
                position += parent_position;
            }
        }

        Some(position)
    }
}

impl OrbitProvider for Universe {
    fn orbit(&self, body: BodyId) -> Option<&Orbit> {
        self.get_body(body)?.orbit.as_ref()
    }

    fn dv_from_excess_velocity(&self, body: BodyId, excess_velocity: DVec3) -> f64 {
        match self.get_body(body) {
            Some(body) => body.get_dv_from_excess_velocity(self.g, excess_velocity),
            None => excess_velocity.length(),
        }
    }
}

impl Default for Universe {
    fn default() -> Self {
        Universe::new(None, None)
    }
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Universe with {} bodies, t={}",
            self.bodies.len(),
            self.time
        )
    }
}
