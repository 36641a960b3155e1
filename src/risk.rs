//! Risk scoring for a finished session.

use serde::{Deserialize, Serialize};

use crate::signatures::match_exploit;
use crate::types::RiskLevel;

/// Points added for every banner that matches an exploit signature.
pub const SIGNATURE_WEIGHT: u32 = 5;
pub const MEDIUM_THRESHOLD: u32 = 5;
pub const HIGH_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
}

/// One point per open port plus [`SIGNATURE_WEIGHT`] per matching banner.
///
/// The score is not clamped; wide ranges with many findings keep growing.
pub fn score<'a, I>(open_ports: &[u16], banners: I) -> RiskAssessment
where
    I: IntoIterator<Item = &'a str>,
{
    let matches = banners
        .into_iter()
        .filter(|b| match_exploit(b).is_some())
        .count();
    let score = (open_ports.len() as u32)
        .saturating_add((matches as u32).saturating_mul(SIGNATURE_WEIGHT));
    RiskAssessment {
        score,
        level: level_for(score),
    }
}

pub fn level_for(score: u32) -> RiskLevel {
    if score >= HIGH_THRESHOLD {
        RiskLevel::High
    } else if score >= MEDIUM_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
