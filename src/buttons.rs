//! Packed input-button word.
//!
//! One `u32` carries everything a client pressed during a tic:
//!
//! | Bits    | Content                                    |
//! |---------|--------------------------------------------|
//! | 0..=5   | [`ButtonFlags`]                            |
//! | 6..=11  | move angle, quantized to 64 steps          |
//! | 12..=18 | look angle, quantized to 128 steps         |
//! | 19..    | unassigned, preserved verbatim             |
//!
//! The codec never interprets the word; it is copied as-is into the packet.

use std::f32::consts::TAU;
use std::fmt;

bitflags::bitflags! {
    /// Held or pressed inputs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
    pub struct ButtonFlags: u32 {
        /// A movement direction is held.
        const MOVE = 0x1;
        /// Run modifier.
        const RUN = 0x2;
        /// Jump pressed.
        const JUMP = 0x4;
        /// Fire held.
        const SHOOT = 0x8;
        /// Drop the held item.
        const DROP = 0x10;
        /// Request to spawn; the event carries the spawn position.
        const SPAWN = 0x20;
    }
}

/// Number of quantization steps of the move angle.
pub const MOVE_ANGLE_STEPS: u32 = 0x40;
/// Bit offset of the move angle.
pub const MOVE_ANGLE_SHIFT: u32 = 6;
/// Number of quantization steps of the look angle.
pub const LOOK_ANGLE_STEPS: u32 = 0x80;
/// Bit offset of the look angle.
pub const LOOK_ANGLE_SHIFT: u32 = 12;

const MOVE_ANGLE_MASK: u32 = (MOVE_ANGLE_STEPS - 1) << MOVE_ANGLE_SHIFT;
const LOOK_ANGLE_MASK: u32 = (LOOK_ANGLE_STEPS - 1) << LOOK_ANGLE_SHIFT;

/// A packed button word.
///
/// # Examples
///
/// ```
/// use ticwire::buttons::{ButtonFlags, InputButtons};
///
/// let buttons = InputButtons::default()
///     .with_flags(ButtonFlags::MOVE | ButtonFlags::RUN)
///     .with_move_angle(16);
/// assert!(buttons.contains(ButtonFlags::RUN));
/// assert_eq!(buttons.move_angle(), 16);
/// assert_eq!(buttons.look_angle(), 0);
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct InputButtons(u32);

impl InputButtons {
    /// Wraps a raw word.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw word.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns the flag bits, ignoring the angle sub-fields.
    #[inline]
    #[must_use]
    pub const fn flags(self) -> ButtonFlags {
        ButtonFlags::from_bits_truncate(self.0)
    }

    /// Returns `true` if all of `flags` are set.
    #[inline]
    #[must_use]
    pub const fn contains(self, flags: ButtonFlags) -> bool {
        self.flags().contains(flags)
    }

    /// Replaces the flag bits.
    #[must_use]
    pub const fn with_flags(self, flags: ButtonFlags) -> Self {
        Self((self.0 & !ButtonFlags::all().bits()) | flags.bits())
    }

    /// Quantized move angle, `0..MOVE_ANGLE_STEPS`.
    #[inline]
    #[must_use]
    pub const fn move_angle(self) -> u32 {
        (self.0 & MOVE_ANGLE_MASK) >> MOVE_ANGLE_SHIFT
    }

    /// Sets the move angle; `step` is reduced modulo [`MOVE_ANGLE_STEPS`].
    #[must_use]
    pub const fn with_move_angle(self, step: u32) -> Self {
        let step = step % MOVE_ANGLE_STEPS;
        Self((self.0 & !MOVE_ANGLE_MASK) | (step << MOVE_ANGLE_SHIFT))
    }

    /// Quantized look angle, `0..LOOK_ANGLE_STEPS`.
    #[inline]
    #[must_use]
    pub const fn look_angle(self) -> u32 {
        (self.0 & LOOK_ANGLE_MASK) >> LOOK_ANGLE_SHIFT
    }

    /// Sets the look angle; `step` is reduced modulo [`LOOK_ANGLE_STEPS`].
    #[must_use]
    pub const fn with_look_angle(self, step: u32) -> Self {
        let step = step % LOOK_ANGLE_STEPS;
        Self((self.0 & !LOOK_ANGLE_MASK) | (step << LOOK_ANGLE_SHIFT))
    }
}

impl From<u32> for InputButtons {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl From<InputButtons> for u32 {
    fn from(buttons: InputButtons) -> Self {
        buttons.0
    }
}

impl From<ButtonFlags> for InputButtons {
    fn from(flags: ButtonFlags) -> Self {
        Self(flags.bits())
    }
}

impl fmt::Display for InputButtons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#07x}", self.0)
    }
}

/// Quantizes an angle in radians to `steps` buckets, rounding to nearest.
///
/// Non-finite angles map to step 0.
#[must_use]
pub fn quantize_angle(radians: f32, steps: u32) -> u32 {
    if !radians.is_finite() || steps == 0 {
        return 0;
    }
    let turns = radians.rem_euclid(TAU) / TAU;
    ((turns * steps as f32).round() as u32) % steps
}

/// Inverse of [`quantize_angle`], returning the bucket's angle in `[0, TAU)`.
#[must_use]
pub fn dequantize_angle(step: u32, steps: u32) -> f32 {
    if steps == 0 {
        return 0.0;
    }
    (step % steps) as f32 / steps as f32 * TAU
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn test_subfields_do_not_overlap() {
        let buttons = InputButtons::default()
            .with_flags(ButtonFlags::all())
            .with_move_angle(MOVE_ANGLE_STEPS - 1)
            .with_look_angle(LOOK_ANGLE_STEPS - 1);
        assert_eq!(buttons.flags(), ButtonFlags::all());
        assert_eq!(buttons.move_angle(), 63);
        assert_eq!(buttons.look_angle(), 127);
        assert_eq!(buttons.bits(), 0x7_FFFF);
    }

    #[test]
    fn test_with_flags_keeps_angles() {
        let buttons = InputButtons::default()
            .with_move_angle(5)
            .with_flags(ButtonFlags::SHOOT);
        assert_eq!(buttons.move_angle(), 5);
        assert_eq!(buttons.flags(), ButtonFlags::SHOOT);
        let cleared = buttons.with_flags(ButtonFlags::empty());
        assert_eq!(cleared.move_angle(), 5);
        assert!(!cleared.contains(ButtonFlags::SHOOT));
    }

    #[test]
    fn test_angle_wraps() {
        assert_eq!(InputButtons::default().with_move_angle(65).move_angle(), 1);
        assert_eq!(InputButtons::default().with_look_angle(128).look_angle(), 0);
    }

    #[test]
    fn test_unassigned_bits_preserved() {
        let raw = 0x8000_0000 | ButtonFlags::JUMP.bits();
        let buttons = InputButtons::from_bits(raw).with_move_angle(3);
        assert_eq!(buttons.bits() & 0x8000_0000, 0x8000_0000);
        assert!(buttons.contains(ButtonFlags::JUMP));
    }

    #[test]
    fn test_quantize_angle() {
        assert_eq!(quantize_angle(0.0, MOVE_ANGLE_STEPS), 0);
        assert_eq!(quantize_angle(TAU / 4.0, MOVE_ANGLE_STEPS), 16);
        assert_eq!(quantize_angle(-TAU / 4.0, MOVE_ANGLE_STEPS), 48);
        assert_eq!(quantize_angle(TAU - 0.001, MOVE_ANGLE_STEPS), 0);
        assert_eq!(quantize_angle(f32::NAN, MOVE_ANGLE_STEPS), 0);
    }

    #[test]
    fn test_dequantize_angle() {
        let angle = dequantize_angle(32, LOOK_ANGLE_STEPS);
        assert!((angle - TAU / 4.0).abs() < 1e-6);
        assert_eq!(quantize_angle(angle, LOOK_ANGLE_STEPS), 32);
    }
}
