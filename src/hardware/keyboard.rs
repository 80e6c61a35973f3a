//! Desktop stand-in for the encoder/footswitch GPIO scanner.
//!
//! Core layout: ←/→ rotate, Enter short press, Space long press.
//! V1 layout: top encoder as above, bottom encoder on ↑/↓, Tab, Backspace.
//! Digits 1-9 press footswitches 0-8. `q` or Ctrl+C quits.

use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{ChannelInput, EncoderId, InputEvent};
use crate::config::Generation;
use crate::deep::Direction;
use crate::modes::EncoderEvent;

/// Start the capture thread. Events are funneled through a bounded queue
/// drained by the control loop.
pub fn spawn(generation: Generation) -> anyhow::Result<(ChannelInput, JoinHandle<()>)> {
    let (tx, rx) = crossbeam_channel::bounded::<InputEvent>(64);
    let handle = std::thread::Builder::new()
        .name("keyboard".into())
        .spawn(move || capture(generation, tx))?;
    Ok((ChannelInput::new(rx), handle))
}

fn capture(generation: Generation, tx: Sender<InputEvent>) {
    loop {
        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(e) => {
                log::error!("Keyboard capture failed: {e}");
                let _ = tx.send(InputEvent::Quit);
                return;
            }
        };
        let Some(input) = map_key(generation, key) else {
            continue;
        };
        if input == InputEvent::Quit {
            let _ = tx.send(input);
            return;
        }
        if tx.try_send(input).is_err() {
            log::warn!("Input queue full, dropping {input:?}");
        }
    }
}

pub fn map_key(generation: Generation, key: KeyEvent) -> Option<InputEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(InputEvent::Quit);
    }
    let main = match generation {
        Generation::Core => EncoderId::Universal,
        Generation::V1 => EncoderId::Top,
    };
    let encoder = |id, ev| Some(InputEvent::Encoder(id, ev));
    match key.code {
        KeyCode::Char('q') => Some(InputEvent::Quit),
        KeyCode::Right => encoder(main, EncoderEvent::Rotate(Direction::Forward)),
        KeyCode::Left => encoder(main, EncoderEvent::Rotate(Direction::Backward)),
        KeyCode::Enter => encoder(main, EncoderEvent::Released),
        KeyCode::Char(' ') => encoder(main, EncoderEvent::LongPressed),
        KeyCode::Char(c @ '1'..='9') => Some(InputEvent::Footswitch(c as usize - '1' as usize)),
        _ if generation == Generation::Core => None,
        KeyCode::Up => encoder(EncoderId::Bottom, EncoderEvent::Rotate(Direction::Forward)),
        KeyCode::Down => encoder(EncoderId::Bottom, EncoderEvent::Rotate(Direction::Backward)),
        KeyCode::Tab => encoder(EncoderId::Bottom, EncoderEvent::Released),
        KeyCode::Backspace => encoder(EncoderId::Bottom, EncoderEvent::LongPressed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn core_layout_drives_universal_encoder() {
        assert_eq!(
            map_key(Generation::Core, press(KeyCode::Right)),
            Some(InputEvent::Encoder(
                EncoderId::Universal,
                EncoderEvent::Rotate(Direction::Forward)
            ))
        );
        assert_eq!(map_key(Generation::Core, press(KeyCode::Up)), None);
    }

    #[test]
    fn v1_layout_splits_encoders() {
        assert_eq!(
            map_key(Generation::V1, press(KeyCode::Enter)),
            Some(InputEvent::Encoder(EncoderId::Top, EncoderEvent::Released))
        );
        assert_eq!(
            map_key(Generation::V1, press(KeyCode::Backspace)),
            Some(InputEvent::Encoder(EncoderId::Bottom, EncoderEvent::LongPressed))
        );
    }

    #[test]
    fn digits_press_footswitches() {
        assert_eq!(
            map_key(Generation::Core, press(KeyCode::Char('1'))),
            Some(InputEvent::Footswitch(0))
        );
        assert_eq!(
            map_key(Generation::V1, press(KeyCode::Char('4'))),
            Some(InputEvent::Footswitch(3))
        );
    }

    #[test]
    fn ctrl_c_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(Generation::Core, key), Some(InputEvent::Quit));
    }
}
