//! This module contains presets for Saturn and its major moons.
//!
//! "Saturn is the sixth planet from the Sun and the second largest in the
//! Solar System, after Jupiter."
//!
//! \- [Wikipedia](https://en.wikipedia.org/wiki/Saturn)
//!
//! Moon orbits are flattened into Saturn's equatorial plane (the XY
//! plane), and timed so that each moon sits at its listed mean anomaly at
//! time zero.

use tracing::warn;

use crate::{Body, BodyAddError, BodyId, Orbit, Universe};

/// The mass of Saturn, in kilograms.
pub const SATURN_MASS: f64 = 568.336e24;

/// The equatorial radius of Saturn, in meters.
pub const SATURN_RADIUS: f64 = 58.232e6;

struct MoonElements {
    semi_major_axis: f64,
    eccentricity: f64,
    mean_anomaly_deg: f64,
    long_asc_node_deg: f64,
    arg_pe_deg: f64,
    prograde: bool,
}

fn moon(name: &str, mass: f64, radius: f64, elements: MoonElements, parent_mu: Option<f64>) -> Body {
    let orbit = parent_mu.and_then(|mu| {
        let mean_motion = (mu / elements.semi_major_axis.powi(3)).sqrt();
        let epoch = -elements.mean_anomaly_deg.to_radians() / mean_motion;

        Orbit::new_flat(
            elements.eccentricity,
            elements.semi_major_axis,
            (elements.long_asc_node_deg + elements.arg_pe_deg).to_radians(),
            epoch,
            mu,
            elements.prograde,
        )
        .inspect_err(|err| warn!(moon = name, %err, "preset moon left without an orbit"))
        .ok()
    });

    Body::new(name.to_string(), mass, radius, orbit)
}

/// Returns Saturn.
///
/// Saturn is the root of this system and is never placed in an orbit.
pub fn saturn() -> Body {
    Body::new("Saturn".to_string(), SATURN_MASS, SATURN_RADIUS, None)
}

/// Returns Mimas, the innermost of Saturn's major moons.
///
/// `parent_mu`: The gravitational parameter of the parent body, if any.
/// If None, the celestial body will not be placed in an orbit.
pub fn mimas(parent_mu: Option<f64>) -> Body {
    moon(
        "Mimas",
        3.7493e19,
        198.2e3,
        MoonElements {
            semi_major_axis: 198.200e6,
            eccentricity: 0.020,
            mean_anomaly_deg: 275.0,
            long_asc_node_deg: 40.6,
            arg_pe_deg: 160.0,
            prograde: true,
        },
        parent_mu,
    )
}

/// Returns Enceladus.
///
/// `parent_mu`: The gravitational parameter of the parent body, if any.
/// If None, the celestial body will not be placed in an orbit.
pub fn enceladus(parent_mu: Option<f64>) -> Body {
    moon(
        "Enceladus",
        1.08022e20,
        252.1e3,
        MoonElements {
            semi_major_axis: 237.905e6,
            eccentricity: 0.005,
            mean_anomaly_deg: 57.0,
            long_asc_node_deg: 40.6,
            arg_pe_deg: 119.5,
            prograde: true,
        },
        parent_mu,
    )
}

/// Returns Tethys.
///
/// `parent_mu`: The gravitational parameter of the parent body, if any.
/// If None, the celestial body will not be placed in an orbit.
pub fn tethys(parent_mu: Option<f64>) -> Body {
    moon(
        "Tethys",
        6.17449e20,
        531.1e3,
        MoonElements {
            semi_major_axis: 294.619e6,
            eccentricity: 0.001,
            mean_anomaly_deg: 0.0,
            long_asc_node_deg: 40.6,
            arg_pe_deg: 335.3,
            prograde: true,
        },
        parent_mu,
    )
}

/// Returns Rhea.
///
/// `parent_mu`: The gravitational parameter of the parent body, if any.
/// If None, the celestial body will not be placed in an orbit.
pub fn rhea(parent_mu: Option<f64>) -> Body {
    moon(
        "Rhea",
        2.306518e21,
        763.8e3,
        MoonElements {
            semi_major_axis: 527.108e6,
            eccentricity: 0.001,
            mean_anomaly_deg: 31.5,
            long_asc_node_deg: 40.6,
            arg_pe_deg: 44.3,
            prograde: true,
        },
        parent_mu,
    )
}

/// Returns Titan, Saturn's largest moon.
///
/// `parent_mu`: The gravitational parameter of the parent body, if any.
/// If None, the celestial body will not be placed in an orbit.
pub fn titan(parent_mu: Option<f64>) -> Body {
    moon(
        "Titan",
        1.3452e23,
        2574.73e3,
        MoonElements {
            semi_major_axis: 1221.930e6,
            eccentricity: 0.029,
            mean_anomaly_deg: 11.7,
            long_asc_node_deg: 36.4,
            arg_pe_deg: 78.3,
            prograde: true,
        },
        parent_mu,
    )
}

/// Returns Iapetus.
///
/// `parent_mu`: The gravitational parameter of the parent body, if any.
/// If None, the celestial body will not be placed in an orbit.
pub fn iapetus(parent_mu: Option<f64>) -> Body {
    moon(
        "Iapetus",
        1.805635e21,
        734.5e3,
        MoonElements {
            semi_major_axis: 3560.820e6,
            eccentricity: 0.028,
            mean_anomaly_deg: 74.8,
            long_asc_node_deg: 288.7,
            arg_pe_deg: 254.5,
            prograde: true,
        },
        parent_mu,
    )
}

/// Returns Phoebe, an irregular moon on a retrograde orbit.
///
/// `parent_mu`: The gravitational parameter of the parent body, if any.
/// If None, the celestial body will not be placed in an orbit.
pub fn phoebe(parent_mu: Option<f64>) -> Body {
    moon(
        "Phoebe",
        8.292e18,
        106.5e3,
        MoonElements {
            semi_major_axis: 12929.400e6,
            eccentricity: 0.164,
            mean_anomaly_deg: 308.0,
            long_asc_node_deg: 276.0,
            arg_pe_deg: 240.3,
            prograde: false,
        },
        parent_mu,
    )
}

/// The IDs of the bodies added by [`add_saturn_system`].
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaturnSystem {
    pub saturn: BodyId,
    pub mimas: BodyId,
    pub enceladus: BodyId,
    pub tethys: BodyId,
    pub rhea: BodyId,
    pub titan: BodyId,
    pub iapetus: BodyId,
    pub phoebe: BodyId,
}

impl SaturnSystem {
    /// The moons, from the innermost out.
    pub fn moons(&self) -> [BodyId; 7] {
        [
            self.mimas,
            self.enceladus,
            self.tethys,
            self.rhea,
            self.titan,
            self.iapetus,
            self.phoebe,
        ]
    }
}

/// Adds Saturn and its major moons to a universe.
///
/// The moons' gravitational parameter is derived from the universe's
/// gravitational constant.
///
/// # Errors
/// Adding top-level bodies can't fail in practice, but errors from
/// [`Universe::add_body`] are passed through.
pub fn add_saturn_system(universe: &mut Universe) -> Result<SaturnSystem, BodyAddError> {
    let mu = Some(universe.g * SATURN_MASS);

    let mut add = |body: Body, parent: Option<BodyId>| {
        universe.add_body(body, parent).map_err(|(err, _)| err)
    };

    let saturn = add(saturn(), None)?;
    let parent = Some(saturn);

    Ok(SaturnSystem {
        saturn,
        mimas: add(mimas(mu), parent)?,
        enceladus: add(enceladus(mu), parent)?,
        tethys: add(tethys(mu), parent)?,
        rhea: add(rhea(mu), parent)?,
        titan: add(titan(mu), parent)?,
        iapetus: add(iapetus(mu), parent)?,
        phoebe: add(phoebe(mu), parent)?,
    })
}
