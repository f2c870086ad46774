//! Mid-run random events.
//!
//! Each event family has its own ante-free stream; a clause names an outcome
//! and the roll indices to test. Because stream draws are random-access,
//! sparse and out-of-order index lists cost exactly one draw each while
//! keeping sequential semantics.

use cart_rng::{F64x8, Mask8, StreamError, StreamId, StreamPlan};

use crate::items::fold_name;

/// Lucky-card money trigger chance.
const LUCKY_MONEY: f64 = 1.0 / 15.0;
/// Lucky-card mult trigger chance.
const LUCKY_MULT: f64 = 1.0 / 5.0;
/// Misprint rolls a mult floor in 0..=MISPRINT_MAX.
const MISPRINT_MAX: u32 = 23;
/// Wheel-of-fortune trigger chance; the triggered remainder splits into
/// Foil .5 / Holo .35 / Polychrome .15.
const WHEEL_TRIGGER: f64 = 0.25;
const WHEEL_FOIL: f64 = 0.50;
const WHEEL_HOLO: f64 = 0.85;
/// Per-round extinction chances.
const GROS_MICHEL_GONE: f64 = 1.0 / 6.0;
const CAVENDISH_GONE: f64 = 1.0 / 1000.0;

/// A testable event outcome; the filter's `Event` clause values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventCheck {
    LuckyMoney,
    LuckyMult,
    MisprintMax,
    MisprintZero,
    WheelFoil,
    WheelHolo,
    WheelPolychrome,
    WheelNone,
    GrosMichelGone,
    CavendishGone,
}

impl EventCheck {
    pub const ALL: &'static [EventCheck] = &[
        EventCheck::LuckyMoney,
        EventCheck::LuckyMult,
        EventCheck::MisprintMax,
        EventCheck::MisprintZero,
        EventCheck::WheelFoil,
        EventCheck::WheelHolo,
        EventCheck::WheelPolychrome,
        EventCheck::WheelNone,
        EventCheck::GrosMichelGone,
        EventCheck::CavendishGone,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventCheck::LuckyMoney => "LuckyMoney",
            EventCheck::LuckyMult => "LuckyMult",
            EventCheck::MisprintMax => "MisprintMax",
            EventCheck::MisprintZero => "MisprintZero",
            EventCheck::WheelFoil => "WheelFoil",
            EventCheck::WheelHolo => "WheelHolo",
            EventCheck::WheelPolychrome => "WheelPolychrome",
            EventCheck::WheelNone => "WheelNone",
            EventCheck::GrosMichelGone => "GrosMichelGone",
            EventCheck::CavendishGone => "CavendishGone",
        }
    }

    pub fn from_name(s: &str) -> Option<EventCheck> {
        let want = fold_name(s);
        EventCheck::ALL
            .iter()
            .copied()
            .find(|v| fold_name(v.name()) == want)
    }

    /// The stream this outcome is rolled on. Checks within one family share
    /// a stream, so `WheelFoil` and `WheelNone` at the same index are
    /// mutually exclusive by construction.
    pub fn stream_key(self) -> &'static str {
        match self {
            EventCheck::LuckyMoney => "ev_lucky_money",
            EventCheck::LuckyMult => "ev_lucky_mult",
            EventCheck::MisprintMax | EventCheck::MisprintZero => "ev_misprint",
            EventCheck::WheelFoil
            | EventCheck::WheelHolo
            | EventCheck::WheelPolychrome
            | EventCheck::WheelNone => "ev_wheel",
            EventCheck::GrosMichelGone => "ev_gros_michel",
            EventCheck::CavendishGone => "ev_cavendish",
        }
    }

    pub fn declare(self, plan: &mut StreamPlan) -> Result<StreamId, StreamError> {
        plan.declare(self.stream_key())
    }

    /// Scalar outcome test; the lane-wide form must agree bit for bit.
    pub fn matches(self, u: f64) -> bool {
        match self {
            EventCheck::LuckyMoney => u < LUCKY_MONEY,
            EventCheck::LuckyMult => u < LUCKY_MULT,
            EventCheck::MisprintMax => misprint_roll(u) == MISPRINT_MAX,
            EventCheck::MisprintZero => misprint_roll(u) == 0,
            EventCheck::WheelFoil => wheel_roll(u) == Some(WheelOutcome::Foil),
            EventCheck::WheelHolo => wheel_roll(u) == Some(WheelOutcome::Holo),
            EventCheck::WheelPolychrome => wheel_roll(u) == Some(WheelOutcome::Polychrome),
            EventCheck::WheelNone => wheel_roll(u).is_none(),
            EventCheck::GrosMichelGone => u < GROS_MICHEL_GONE,
            EventCheck::CavendishGone => u < CAVENDISH_GONE,
        }
    }

    /// Lane-wide outcome test.
    #[inline]
    pub fn matches8(self, u: F64x8) -> Mask8 {
        Mask8::from_fn(|k| self.matches(u.lane(k)))
    }
}

impl std::fmt::Display for EventCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WheelOutcome {
    Foil,
    Holo,
    Polychrome,
}

#[inline]
fn misprint_roll(u: f64) -> u32 {
    (u * (MISPRINT_MAX + 1) as f64) as u32
}

#[inline]
fn wheel_roll(u: f64) -> Option<WheelOutcome> {
    if u >= WHEEL_TRIGGER {
        return None;
    }
    let v = u / WHEEL_TRIGGER;
    Some(if v < WHEEL_FOIL {
        WheelOutcome::Foil
    } else if v < WHEEL_HOLO {
        WheelOutcome::Holo
    } else {
        WheelOutcome::Polychrome
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_partition_is_exclusive_and_total() {
        for i in 0..10_000 {
            let u = i as f64 / 10_000.0;
            let hits = [
                EventCheck::WheelFoil,
                EventCheck::WheelHolo,
                EventCheck::WheelPolychrome,
                EventCheck::WheelNone,
            ]
            .iter()
            .filter(|c| c.matches(u))
            .count();
            assert_eq!(hits, 1, "u={u}");
        }
    }

    #[test]
    fn misprint_extremes() {
        assert!(EventCheck::MisprintZero.matches(0.0));
        assert!(!EventCheck::MisprintZero.matches(0.05));
        assert!(EventCheck::MisprintMax.matches(0.999));
        assert!(!EventCheck::MisprintMax.matches(0.95));
    }

    #[test]
    fn name_round_trip() {
        for &c in EventCheck::ALL {
            assert_eq!(EventCheck::from_name(c.name()), Some(c));
        }
        assert_eq!(EventCheck::from_name("wheel foil"), Some(EventCheck::WheelFoil));
        assert_eq!(EventCheck::from_name("nope"), None);
    }

    #[test]
    fn family_checks_share_streams() {
        assert_eq!(
            EventCheck::WheelFoil.stream_key(),
            EventCheck::WheelNone.stream_key()
        );
        assert_ne!(
            EventCheck::LuckyMoney.stream_key(),
            EventCheck::LuckyMult.stream_key()
        );
    }
}
