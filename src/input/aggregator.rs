//! Cross-thread input aggregation
//!
//! # Thread Safety
//!
//! Platform callbacks call [`InputAggregator::submit`] from any thread; the
//! tick thread calls [`InputAggregator::take_changed`] once per tick. Both
//! take the same short-lived lock, so the tick thread always reads a
//! consistent combined state.

use super::{clamp_axis, combine, Buttons, ControllerState, InputSource};
use parking_lot::Mutex;

/// Input update posted by a platform callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Replace a source's full button set
    Buttons {
        /// Originating source
        source: InputSource,
        /// Buttons now held
        buttons: Buttons,
    },
    /// Press or release buttons on a source
    Button {
        /// Originating source
        source: InputSource,
        /// Affected button(s)
        button: Buttons,
        /// New state
        pressed: bool,
    },
    /// Joystick position from a source (clamped to −5..=+5)
    Axis {
        /// Originating source
        source: InputSource,
        /// Horizontal position
        x: i8,
        /// Vertical position
        y: i8,
    },
    /// Source went away; its contribution returns to neutral
    Disconnected(InputSource),
    /// Console power (ON) button
    Power {
        /// New state
        pressed: bool,
    },
}

#[derive(Debug, Default)]
struct SourceStates {
    virtual_pad: ControllerState,
    hardware: ControllerState,
    combined: ControllerState,
    /// Last state handed to the core
    forwarded: ControllerState,
    /// Power button change not yet handed to the core
    power: Option<bool>,
}

impl SourceStates {
    fn source_mut(&mut self, source: InputSource) -> &mut ControllerState {
        match source {
            InputSource::Virtual => &mut self.virtual_pad,
            InputSource::Hardware => &mut self.hardware,
        }
    }
}

/// Merges virtual and hardware controller input
#[derive(Debug, Default)]
pub struct InputAggregator {
    state: Mutex<SourceStates>,
}

impl InputAggregator {
    /// Create an aggregator with both sources neutral
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one input event and recombine
    pub fn submit(&self, event: InputEvent) {
        let mut state = self.state.lock();

        match event {
            InputEvent::Buttons { source, buttons } => {
                state.source_mut(source).buttons = buttons;
            }
            InputEvent::Button {
                source,
                button,
                pressed,
            } => {
                state.source_mut(source).buttons.set(button, pressed);
            }
            InputEvent::Axis { source, x, y } => {
                let pad = state.source_mut(source);
                pad.x = clamp_axis(x);
                pad.y = clamp_axis(y);
            }
            InputEvent::Disconnected(source) => {
                log::debug!("Input source {source:?} disconnected");
                *state.source_mut(source) = ControllerState::NEUTRAL;
            }
            InputEvent::Power { pressed } => {
                state.power = Some(pressed);
                return;
            }
        }

        state.combined = combine(&state.virtual_pad, &state.hardware);
    }

    /// Combined state if it differs from the last one taken, marking it forwarded
    pub fn take_changed(&self) -> Option<ControllerState> {
        let mut state = self.state.lock();
        if state.combined == state.forwarded {
            return None;
        }
        state.forwarded = state.combined;
        Some(state.combined)
    }

    /// Pending power button change, if any
    pub fn take_power(&self) -> Option<bool> {
        self.state.lock().power.take()
    }

    /// Current combined state without marking it forwarded
    pub fn current(&self) -> ControllerState {
        self.state.lock().combined
    }

    /// Forget what was forwarded; call after the core resets to neutral input
    pub fn reset_forwarded(&self) {
        self.state.lock().forwarded = ControllerState::NEUTRAL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unchanged_state_not_forwarded() {
        let input = InputAggregator::new();
        assert_eq!(input.take_changed(), None);

        input.submit(InputEvent::Button {
            source: InputSource::Virtual,
            button: Buttons::RED,
            pressed: true,
        });
        let forwarded = input.take_changed().unwrap();
        assert_eq!(forwarded.buttons, Buttons::RED);
        assert_eq!(input.take_changed(), None);

        // Hardware pressing the same button leaves the combination unchanged
        input.submit(InputEvent::Buttons {
            source: InputSource::Hardware,
            buttons: Buttons::RED,
        });
        assert_eq!(input.take_changed(), None);
    }

    #[test]
    fn test_hardware_disconnect_clears_stale_state() {
        let input = InputAggregator::new();
        input.submit(InputEvent::Buttons {
            source: InputSource::Hardware,
            buttons: Buttons::ENTER | Buttons::BLUE,
        });
        input.submit(InputEvent::Axis {
            source: InputSource::Hardware,
            x: 4,
            y: -4,
        });
        input.submit(InputEvent::Axis {
            source: InputSource::Virtual,
            x: -2,
            y: 0,
        });
        assert_eq!(
            input.take_changed(),
            Some(ControllerState::new(Buttons::ENTER | Buttons::BLUE, 4, -4))
        );

        input.submit(InputEvent::Disconnected(InputSource::Hardware));
        assert_eq!(
            input.take_changed(),
            Some(ControllerState::new(Buttons::empty(), -2, 0))
        );
    }

    #[test]
    fn test_axis_events_clamped() {
        let input = InputAggregator::new();
        input.submit(InputEvent::Axis {
            source: InputSource::Virtual,
            x: 9,
            y: -128,
        });
        let current = input.current();
        assert_eq!((current.x, current.y), (5, -5));
    }

    #[test]
    fn test_release_single_button() {
        let input = InputAggregator::new();
        input.submit(InputEvent::Buttons {
            source: InputSource::Virtual,
            buttons: Buttons::HELP | Buttons::ABC,
        });
        input.submit(InputEvent::Button {
            source: InputSource::Virtual,
            button: Buttons::HELP,
            pressed: false,
        });
        assert_eq!(input.current().buttons, Buttons::ABC);
    }

    #[test]
    fn test_reset_forwarded_resends_held_state() {
        let input = InputAggregator::new();
        input.submit(InputEvent::Buttons {
            source: InputSource::Virtual,
            buttons: Buttons::GREEN,
        });
        assert!(input.take_changed().is_some());
        assert!(input.take_changed().is_none());

        input.reset_forwarded();
        assert_eq!(input.take_changed().unwrap().buttons, Buttons::GREEN);
    }

    #[test]
    fn test_power_is_taken_once() {
        let input = InputAggregator::new();
        assert_eq!(input.take_power(), None);
        input.submit(InputEvent::Power { pressed: true });
        assert_eq!(input.take_power(), Some(true));
        assert_eq!(input.take_power(), None);
        // Power does not touch the controller state
        assert_eq!(input.take_changed(), None);
    }

    #[test]
    fn test_concurrent_submitters() {
        let input = Arc::new(InputAggregator::new());
        let workers: Vec<_> = [
            (InputSource::Virtual, Buttons::RED),
            (InputSource::Hardware, Buttons::BLUE),
        ]
        .into_iter()
        .map(|(source, button)| {
            let input = Arc::clone(&input);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    input.submit(InputEvent::Button {
                        source,
                        button,
                        pressed: i % 2 == 0,
                    });
                }
                input.submit(InputEvent::Button {
                    source,
                    button,
                    pressed: true,
                });
            })
        })
        .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(input.current().buttons, Buttons::RED | Buttons::BLUE);
    }
}
