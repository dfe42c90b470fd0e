//! Display tiers derived from a raw experience value.
//!
//! Five major tiers of 90 xp, each split into three 30-xp sub-tiers. Pure
//! derivation for the presentation layer; the xp store never consults this.

/// Size of one sub-tier block.
pub const BLOCK_SIZE: i64 = 30;

/// Sub-tiers per major tier.
pub const SUBS_PER_MAJOR: i64 = 3;

/// Xp span of one major tier.
pub const MAJOR_SIZE: i64 = BLOCK_SIZE * SUBS_PER_MAJOR;

/// One major tier's presentation attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MajorTier {
    pub id: &'static str,
    pub label: &'static str,
    /// Badge background color.
    pub color: &'static str,
    /// Icon name consumed by the rendering layer.
    pub icon: &'static str,
}

pub const MAJOR_TIERS: [MajorTier; 5] = [
    MajorTier { id: "novice", label: "Novice", color: "#93C5FD", icon: "Fish" },
    MajorTier { id: "apprentice", label: "Apprentice", color: "#60A5FA", icon: "Waves" },
    MajorTier { id: "skilled", label: "Skilled", color: "#06B6D4", icon: "Anchor" },
    MajorTier { id: "expert", label: "Expert", color: "#14B8A6", icon: "Medal" },
    MajorTier { id: "master", label: "Master", color: "#6366F1", icon: "Crown" },
];

pub const SUB_LABELS: [&str; 3] = ["Beginner", "Intermediate", "Advanced"];

/// Fully-resolved tier description for one xp value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressDescriptor {
    pub xp: i64,
    pub major_index: usize,
    pub major_label: &'static str,
    pub major_color: &'static str,
    pub major_icon: &'static str,
    pub sub_index: usize,
    pub sub_label: &'static str,
    /// Combined label, e.g. "Intermediate Novice".
    pub label: String,
    /// 1-based position inside the sub-tier block.
    pub step: i64,
    /// Block size, the denominator shown next to `step`.
    pub denom: i64,
}

/// Describe `raw` xp. Negative input reads as zero; xp past the final tier
/// pins at Advanced Master with a full block.
pub fn describe_xp(raw: i64) -> ProgressDescriptor {
    let xp = raw.max(0);
    let max_major = MAJOR_TIERS.len() - 1;

    let major_index = ((xp / MAJOR_SIZE) as usize).min(max_major);
    let major = &MAJOR_TIERS[major_index];

    let base = major_index as i64 * MAJOR_SIZE;
    let rel = (xp - base).max(0);
    let sub_index = ((rel / BLOCK_SIZE).min(SUBS_PER_MAJOR - 1)) as usize;
    let sub_label = SUB_LABELS[sub_index];

    let step0 = rel - sub_index as i64 * BLOCK_SIZE;
    let step = (step0 + 1).clamp(1, BLOCK_SIZE);

    ProgressDescriptor {
        xp,
        major_index,
        major_label: major.label,
        major_color: major.color,
        major_icon: major.icon,
        sub_index,
        sub_label,
        label: format!("{sub_label} {}", major.label),
        step,
        denom: BLOCK_SIZE,
    }
}

/// Xp remaining until the next sub-tier (30 at a block's start, 1 at its end).
pub fn xp_to_next_step(xp: i64) -> i64 {
    let descriptor = describe_xp(xp);
    descriptor.denom - (descriptor.step - 1)
}
