//! KVB beacon field decoding.
//!
//! Each KVB signal transmits an execution speed for the section it opens
//! and a target speed announced for the next signal. The field is derived
//! from the passed aspect unless a `KVB:<exec>/<target>` tag overrides it.

use tcs_common::consts::{
    KVB_EXECUTION_A_KPH, KVB_EXECUTION_B_KPH, KVB_EXECUTION_C_KPH, KVB_RELEASE_V10_KPH,
    KVB_RELEASE_V30_KPH, kph_to_mps,
};
use tcs_common::host::{SignalAspect, SignalObservation};

/// Prefix of the field override tag.
pub const FIELD_TAG: &str = "KVB:";
/// Tag selecting the V10 release class for a stop target.
pub const V10_TAG: &str = "KVB_V10";

/// Speed to respect from the passed signal onwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionSpeed {
    /// No execution constraint.
    #[default]
    None,
    /// 30 km/h.
    A,
    /// 60 km/h.
    B,
    /// 160 km/h.
    C,
    /// Train speed limit.
    Vm,
    /// Speed limit carried by the passed signal.
    Vmb,
}

impl ExecutionSpeed {
    fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "-" => Self::None,
            "A" => Self::A,
            "B" => Self::B,
            "C" => Self::C,
            "VM" => Self::Vm,
            "VMb" => Self::Vmb,
            _ => return None,
        })
    }

    /// Limit in m/s, `None` when unconstrained.
    pub fn limit_mps(self, train_limit_mps: f64, signal_limit_mps: Option<f64>) -> Option<f64> {
        match self {
            Self::None => None,
            Self::A => Some(kph_to_mps(KVB_EXECUTION_A_KPH)),
            Self::B => Some(kph_to_mps(KVB_EXECUTION_B_KPH)),
            Self::C => Some(kph_to_mps(KVB_EXECUTION_C_KPH)),
            Self::Vm => Some(train_limit_mps),
            Self::Vmb => Some(signal_limit_mps.unwrap_or(train_limit_mps).min(train_limit_mps)),
        }
    }
}

/// Speed announced for the next signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetSpeed {
    #[default]
    None,
    /// Stop at the next stop-capable signal.
    V0,
    /// 160 km/h at the next signal.
    V160,
    /// Train speed limit: no target.
    Vm,
    /// Speed limit of the next signal.
    Vmb,
}

impl TargetSpeed {
    fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "-" => Self::None,
            "V0" => Self::V0,
            "V160" => Self::V160,
            "VM" => Self::Vm,
            "VMb" => Self::Vmb,
            _ => return None,
        })
    }
}

/// Release speed class of a stop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseSpeed {
    /// Buffer stops and short overlaps.
    V10,
    #[default]
    V30,
}

impl ReleaseSpeed {
    pub const fn mps(self) -> f64 {
        match self {
            Self::V10 => kph_to_mps(KVB_RELEASE_V10_KPH),
            Self::V30 => kph_to_mps(KVB_RELEASE_V30_KPH),
        }
    }
}

/// Decoded field of one passed KVB signal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KvbField {
    pub execution: ExecutionSpeed,
    pub target: TargetSpeed,
    /// Passed at stop.
    pub spad: bool,
    /// Speed limit carried by the passed signal [m/s].
    pub signal_limit_mps: Option<f64>,
}

impl KvbField {
    /// Most restrictive field, used on any decode failure.
    pub const FALLBACK: Self = Self {
        execution: ExecutionSpeed::A,
        target: TargetSpeed::V0,
        spad: false,
        signal_limit_mps: None,
    };

    const fn new(execution: ExecutionSpeed, target: TargetSpeed) -> Self {
        Self {
            execution,
            target,
            spad: false,
            signal_limit_mps: None,
        }
    }

    /// Field implied by a lineside aspect.
    pub const fn from_aspect(aspect: SignalAspect) -> Self {
        use ExecutionSpeed as E;
        use TargetSpeed as T;
        match aspect {
            SignalAspect::Stop => Self {
                spad: true,
                ..Self::new(E::None, T::None)
            },
            SignalAspect::StopAndProceed => Self::new(E::A, T::V0),
            SignalAspect::Restricting | SignalAspect::Permission => Self::new(E::A, T::None),
            SignalAspect::Approach1 => Self::new(E::Vm, T::V0),
            SignalAspect::Approach2 => Self::new(E::Vm, T::V160),
            SignalAspect::Approach3 => Self::new(E::C, T::Vmb),
            SignalAspect::Clear1 | SignalAspect::Clear2 => Self::new(E::Vm, T::Vm),
            SignalAspect::Unknown => Self::FALLBACK,
        }
    }

    /// Parse the part after `KVB:`.
    pub fn parse(value: &str) -> Option<Self> {
        let (exec, target) = value.split_once('/')?;
        Some(Self::new(
            ExecutionSpeed::from_code(exec.trim())?,
            TargetSpeed::from_code(target.trim())?,
        ))
    }

    /// Clear field: no execution constraint below the train limit and no target.
    pub fn is_clear(&self) -> bool {
        self.execution == ExecutionSpeed::Vm && self.target == TargetSpeed::Vm
    }
}

/// Field transmitted by a passed signal, `None` for beacons that carry no
/// KVB information (TVM markers, zone and arming beacons).
pub fn decode(signal: &SignalObservation) -> Option<KvbField> {
    let mut field = match signal.tag_value(FIELD_TAG) {
        Some(value) => KvbField::parse(value).unwrap_or_else(|| {
            tracing::warn!(value, "malformed KVB field, restrictive fallback");
            KvbField::FALLBACK
        }),
        None if signal.aspect == SignalAspect::Unknown && !signal.tags.is_empty() => {
            return None;
        }
        None => {
            if signal.aspect == SignalAspect::Unknown {
                tracing::warn!("KVB field unreadable, restrictive fallback");
            }
            KvbField::from_aspect(signal.aspect)
        }
    };
    field.signal_limit_mps = signal.speed_limit_mps;
    Some(field)
}

/// Release class of a stop signal.
pub fn release_of(signal: &SignalObservation) -> ReleaseSpeed {
    if signal.has_tag(V10_TAG) {
        ReleaseSpeed::V10
    } else {
        ReleaseSpeed::V30
    }
}
