//! Controller input
//!
//! The V.Smile controller has eight buttons and a joystick reporting integer
//! positions in −5..=+5 on each axis. Two sources feed it: on-screen virtual
//! controls and physical hardware. Platform callbacks post [`InputEvent`]s
//! into an [`InputAggregator`]; the tick thread pulls the combined state.

pub mod aggregator;

pub use aggregator::{InputAggregator, InputEvent};

use bitflags::bitflags;

/// Joystick travel on each side of centre
pub const AXIS_MAX: i8 = 5;

/// Default analog dead zone for hardware sticks
pub const DEFAULT_DEADZONE: f32 = 0.15;

bitflags! {
    /// Controller buttons
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Buttons: u8 {
        /// Enter (OK) button
        const ENTER = 0x01;
        /// Help button
        const HELP = 0x02;
        /// Exit button
        const BACK = 0x04;
        /// ABC (learning zone) button
        const ABC = 0x08;
        /// Red colour button
        const RED = 0x10;
        /// Yellow colour button
        const YELLOW = 0x20;
        /// Blue colour button
        const BLUE = 0x40;
        /// Green colour button
        const GREEN = 0x80;
    }
}

impl Default for Buttons {
    fn default() -> Self {
        Buttons::empty()
    }
}

/// Which input source an event comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// On-screen touch controls
    Virtual,
    /// Physical keyboard or gamepad
    Hardware,
}

/// One controller snapshot. `Default` is neutral: nothing pressed, stick centred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ControllerState {
    /// Pressed buttons
    pub buttons: Buttons,
    /// Joystick X, −5 (left) ..= +5 (right)
    pub x: i8,
    /// Joystick Y, −5 (up) ..= +5 (down)
    pub y: i8,
}

impl ControllerState {
    /// Neutral state
    pub const NEUTRAL: ControllerState = ControllerState {
        buttons: Buttons::empty(),
        x: 0,
        y: 0,
    };

    /// Build a state, clamping axes into the joystick range
    pub fn new(buttons: Buttons, x: i8, y: i8) -> Self {
        ControllerState {
            buttons,
            x: clamp_axis(x),
            y: clamp_axis(y),
        }
    }

    /// True if nothing is pressed and the stick is centred
    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

/// Clamp an axis value into −5..=+5
#[inline]
pub fn clamp_axis(value: i8) -> i8 {
    value.clamp(-AXIS_MAX, AXIS_MAX)
}

/// Merge a virtual and a hardware state.
///
/// Buttons are OR-ed. Each axis takes the hardware value when it is off
/// centre and falls back to the virtual value otherwise.
pub fn combine(virtual_pad: &ControllerState, hardware: &ControllerState) -> ControllerState {
    let pick = |virtual_axis: i8, hardware_axis: i8| {
        if hardware_axis != 0 {
            hardware_axis
        } else {
            virtual_axis
        }
    };

    ControllerState {
        buttons: virtual_pad.buttons | hardware.buttons,
        x: pick(virtual_pad.x, hardware.x),
        y: pick(virtual_pad.y, hardware.y),
    }
}

/// Quantise an analog stick value in −1.0..=1.0 to a joystick position.
///
/// Values inside `deadzone` read as centre; the rest of the travel is
/// rescaled to the full −5..=+5 range.
pub fn axis_from_analog(value: f32, deadzone: f32) -> i8 {
    if !value.is_finite() {
        return 0;
    }
    let deadzone = deadzone.clamp(0.0, 0.99);
    if value.abs() < deadzone {
        return 0;
    }

    let magnitude = ((value.abs() - deadzone) / (1.0 - deadzone)).clamp(0.0, 1.0);
    let position = (magnitude * AXIS_MAX as f32).round() as i8;
    if value < 0.0 {
        -position
    } else {
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(buttons: Buttons, x: i8, y: i8) -> ControllerState {
        ControllerState::new(buttons, x, y)
    }

    #[test]
    fn test_buttons_are_ored() {
        let all = [
            Buttons::ENTER,
            Buttons::HELP,
            Buttons::BACK,
            Buttons::ABC,
            Buttons::RED,
            Buttons::YELLOW,
            Buttons::BLUE,
            Buttons::GREEN,
        ];
        for (bits_v, bits_h) in [(0u8, 0u8), (0xFF, 0), (0, 0xFF), (0x5A, 0x0F), (0x81, 0x81)] {
            let v = state(Buttons::from_bits_truncate(bits_v), 0, 0);
            let h = state(Buttons::from_bits_truncate(bits_h), 0, 0);
            let combined = combine(&v, &h);
            for button in all {
                assert_eq!(
                    combined.buttons.contains(button),
                    v.buttons.contains(button) || h.buttons.contains(button)
                );
            }
        }
    }

    #[test]
    fn test_hardware_axis_priority() {
        for hx in -5..=5i8 {
            for vx in -5..=5i8 {
                let v = state(Buttons::empty(), vx, -vx);
                let h = state(Buttons::empty(), hx, 0);
                let combined = combine(&v, &h);
                let expected_x = if hx != 0 { hx } else { vx };
                assert_eq!(combined.x, expected_x);
                // Hardware y is centred, so virtual y wins
                assert_eq!(combined.y, -vx);
            }
        }
    }

    #[test]
    fn test_axes_resolve_independently() {
        let v = state(Buttons::empty(), 3, 4);
        let h = state(Buttons::empty(), 0, -2);
        assert_eq!(combine(&v, &h), state(Buttons::empty(), 3, -2));
    }

    #[test]
    fn test_axis_clamped_on_construction() {
        let s = ControllerState::new(Buttons::RED, 100, -100);
        assert_eq!((s.x, s.y), (5, -5));
        assert!(ControllerState::default().is_neutral());
        assert!(!s.is_neutral());
    }

    #[test]
    fn test_axis_from_analog() {
        assert_eq!(axis_from_analog(0.0, DEFAULT_DEADZONE), 0);
        assert_eq!(axis_from_analog(0.1, DEFAULT_DEADZONE), 0);
        assert_eq!(axis_from_analog(-0.1, DEFAULT_DEADZONE), 0);
        assert_eq!(axis_from_analog(1.0, DEFAULT_DEADZONE), 5);
        assert_eq!(axis_from_analog(-1.0, DEFAULT_DEADZONE), -5);
        assert_eq!(axis_from_analog(2.5, DEFAULT_DEADZONE), 5);
        assert_eq!(axis_from_analog(f32::NAN, DEFAULT_DEADZONE), 0);
        // Halfway through the live range
        assert_eq!(axis_from_analog(0.5, 0.0), 3);
        assert_eq!(axis_from_analog(-0.5, 0.0), -3);
    }
}
