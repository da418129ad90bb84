// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Interactive collision resolution.

use inquire::Confirm;
use std::{cell::Cell, path::Path};

/// Ask the user whether an existing path may be overwritten.
pub trait UserPrompt {
    /// Confirm overwriting a path.
    ///
    /// Blocks the calling thread until the user answers.
    ///
    /// # Errors
    ///
    /// - Return [`PromptError`] if the prompt cannot be displayed or read.
    fn confirm_overwrite(&self, path: &Path) -> Result<bool>;

    /// Confirm an irreversible action described by a message.
    ///
    /// # Errors
    ///
    /// - Return [`PromptError`] if the prompt cannot be displayed or read.
    fn confirm(&self, message: &str) -> Result<bool>;
}

impl<P> UserPrompt for &P
where
    P: UserPrompt + ?Sized,
{
    fn confirm_overwrite(&self, path: &Path) -> Result<bool> {
        (**self).confirm_overwrite(path)
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        (**self).confirm(message)
    }
}

/// Prompt through the terminal using `inquire`.
#[derive(Debug, Default, Clone, Copy)]
pub struct InquirePrompt;

impl UserPrompt for InquirePrompt {
    fn confirm_overwrite(&self, path: &Path) -> Result<bool> {
        self.confirm(&format!("overwrite {}?", path.display()))
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        Ok(Confirm::new(message).with_default(false).prompt()?)
    }
}

/// Prompt that always gives the same answer, counting how often it was asked.
#[derive(Debug, Default)]
pub struct FixedAnswer {
    answer: bool,
    asked: Cell<usize>,
}

impl FixedAnswer {
    /// Construct new prompt answering every question with `answer`.
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Cell::new(0),
        }
    }

    /// Prompt that accepts everything.
    pub fn yes() -> Self {
        Self::new(true)
    }

    /// Prompt that declines everything.
    pub fn no() -> Self {
        Self::new(false)
    }

    /// Number of questions asked so far.
    pub fn asked(&self) -> usize {
        self.asked.get()
    }
}

impl UserPrompt for FixedAnswer {
    fn confirm_overwrite(&self, _path: &Path) -> Result<bool> {
        self.asked.set(self.asked.get() + 1);
        Ok(self.answer)
    }

    fn confirm(&self, _message: &str) -> Result<bool> {
        self.asked.set(self.asked.get() + 1);
        Ok(self.answer)
    }
}

/// Prompt error types.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Terminal prompt failed.
    #[error(transparent)]
    Inquire(#[from] inquire::InquireError),
}

/// Friendly result alias :3
type Result<T, E = PromptError> = std::result::Result<T, E>;
