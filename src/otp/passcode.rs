//! Six slot passcode entry with focus tracking.
//!
//! Each slot mirrors one single-character input box: it is either empty or
//! holds one ASCII digit. Typing a digit moves focus forward, backspace on an
//! empty slot moves it back. Anything else is dropped without a message.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::sync::OnceLock;

/// Number of digits in a passcode.
pub const PASSCODE_LENGTH: usize = 6;

/// One secret per slot, empty for an empty slot.
pub type PasscodeDigits = [SecretString; PASSCODE_LENGTH];

static KEYSTROKE: OnceLock<Option<Regex>> = OnceLock::new();

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PasscodeEntry {
    slots: [Option<char>; PASSCODE_LENGTH],
    focus: usize,
}

/// A keystroke is valid when it is empty or exactly one decimal digit.
pub fn valid_keystroke(raw: &str) -> bool {
    raw.chars().count() <= 1
        && KEYSTROKE
            .get_or_init(|| Regex::new(r"^[0-9]?$").ok())
            .as_ref()
            .map_or(false, |re| re.is_match(raw))
}

/// Concatenation of the slots; empty slots contribute nothing.
#[must_use]
pub fn join(digits: &PasscodeDigits) -> SecretString {
    SecretString::from(
        digits
            .iter()
            .map(|digit| digit.expose_secret())
            .collect::<String>(),
    )
}

impl PasscodeEntry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the slot that currently has focus.
    #[must_use]
    pub fn focus(&self) -> usize {
        self.focus
    }

    /// Value of one slot, `None` when empty or out of range.
    #[must_use]
    pub fn digit(&self, index: usize) -> Option<char> {
        self.slots.get(index).copied().flatten()
    }

    /// Slots rendered as strings, empty string for an empty slot.
    #[must_use]
    pub fn digits(&self) -> [String; PASSCODE_LENGTH] {
        self.slots
            .map(|slot| slot.map(String::from).unwrap_or_default())
    }

    /// Replace the slot at `index` with `raw`.
    ///
    /// Returns `false` when the keystroke was rejected, in which case nothing
    /// changed. Entering a digit at any slot but the last advances focus.
    pub fn set_digit(&mut self, index: usize, raw: &str) -> bool {
        if index >= PASSCODE_LENGTH || !valid_keystroke(raw) {
            return false;
        }

        let value = raw.chars().next();
        self.slots[index] = value;

        if value.is_some() && index < PASSCODE_LENGTH - 1 {
            self.focus = index + 1;
        }

        true
    }

    /// Backspace pressed on an already empty slot: retreat focus.
    ///
    /// The previous slot keeps its value; clearing it is the job of the next
    /// backspace on that slot.
    pub fn handle_backspace(&mut self, index: usize) {
        if index > 0 && index < PASSCODE_LENGTH && self.slots[index].is_none() {
            self.focus = index - 1;
        }
    }

    /// Apply typed or pasted text one keystroke at a time from the focused
    /// slot onwards. Returns how many characters were accepted.
    pub fn fill(&mut self, text: &str) -> usize {
        let mut accepted = 0;

        for ch in text.chars() {
            let index = self.focus;
            let mut buf = [0u8; 4];
            if !self.set_digit(index, ch.encode_utf8(&mut buf)) {
                continue;
            }
            accepted += 1;

            // focus stays on the last slot once it is filled
            if index == PASSCODE_LENGTH - 1 {
                break;
            }
        }

        accepted
    }

    /// Start over: clear every slot and type `text` from the first one.
    pub fn replace(&mut self, text: &str) -> usize {
        *self = Self::default();
        self.fill(text)
    }

    /// Backspace as a terminal sees it: clear the focused slot, or retreat
    /// when it is already empty.
    pub fn backspace(&mut self) {
        let index = self.focus;
        if self.slots[index].is_some() {
            self.slots[index] = None;
        } else {
            self.handle_backspace(index);
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Each slot as its own secret, keeping positions.
    #[must_use]
    pub fn slots(&self) -> PasscodeDigits {
        self.slots
            .map(|slot| SecretString::from(slot.map(String::from).unwrap_or_default()))
    }

    /// Concatenation of all slots; empty slots contribute nothing.
    #[must_use]
    pub fn code(&self) -> SecretString {
        join(&self.slots())
    }
}
