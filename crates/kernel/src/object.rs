use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Sensor turret categories. Some of them see the whole map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Standard,
    CounterBattery,
    VtolIntercept,
    RadarDetector,
    WideSpectrum,
    SatUplink,
}

/// A sensor fitted to a unit or building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    /// Sensor range in world units.
    pub range: i32,
    pub kind: SensorKind,
}

impl Sensor {
    pub const fn new(range: i32, kind: SensorKind) -> Self {
        Self { range, kind }
    }

    pub const fn standard(range: i32) -> Self {
        Self::new(range, SensorKind::Standard)
    }
}

/// Category of a simulation object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// A mobile unit. Every unit carries at least a basic sensor.
    Droid { sensor: Sensor },
    /// A building, optionally with a sensor tower.
    Structure { sensor: Option<Sensor> },
    /// Scenery: trees, oil resources, wrecks.
    Feature,
}

impl ObjectKind {
    /// The sensor this object carries, if any.
    pub fn sensor(&self) -> Option<Sensor> {
        match self {
            ObjectKind::Droid { sensor } => Some(*sensor),
            ObjectKind::Structure { sensor } => *sensor,
            ObjectKind::Feature => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Droid { .. } => "droid",
            ObjectKind::Structure { .. } => "structure",
            ObjectKind::Feature => "feature",
        }
    }
}

/// Per-object data stored in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectData {
    /// Position in world units.
    pub position: IVec2,
    pub kind: ObjectKind,
}

impl ObjectData {
    pub fn new(position: IVec2, kind: ObjectKind) -> Self {
        Self { position, kind }
    }

    pub fn droid(position: IVec2, sensor_range: i32) -> Self {
        Self::new(
            position,
            ObjectKind::Droid {
                sensor: Sensor::standard(sensor_range),
            },
        )
    }

    pub fn structure(position: IVec2, sensor: Option<Sensor>) -> Self {
        Self::new(position, ObjectKind::Structure { sensor })
    }

    pub fn feature(position: IVec2) -> Self {
        Self::new(position, ObjectKind::Feature)
    }
}
