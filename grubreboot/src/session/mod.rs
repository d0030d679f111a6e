// SPDX-License-Identifier: Mulan PSL v2
/*
 * Copyright (c) 2024 Huawei Technologies Co., Ltd.
 * grubreboot is licensed under Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *         http://license.coscl.org.cn/MulanPSL2
 *
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND,
 * EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT,
 * MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use std::{mem, path::PathBuf};

use anyhow::{bail, Result};
use log::{debug, info, warn};

use crate::{
    boot::{
        self, BootEntry, ConfigLocator, PendingSelection, ReadError, SelectionApplier,
        SelectionResult,
    },
    config::Config,
};

mod terminal;

pub use terminal::{run_picker, TerminalDialog};

/// Discovery and apply operations offered to the shutdown dialog.
#[derive(Debug, Clone)]
pub struct BootTargetService {
    locator: ConfigLocator,
    applier: SelectionApplier,
}

impl BootTargetService {
    pub fn new(config: &Config) -> Self {
        Self {
            locator: ConfigLocator::new(config.locator.clone()),
            applier: SelectionApplier::new(config.helper.clone()),
        }
    }

    pub fn locate(&self) -> PathBuf {
        self.locator.locate()
    }

    pub fn discover_entries(&self) -> Result<Vec<BootEntry>, ReadError> {
        boot::parse(self.locate())
    }

    pub fn select_entry<F>(&self, title: &str, on_complete: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.applier
            .apply_with(title, move |result| on_complete(result.succeeded));
    }

    pub fn apply(&self, title: &str) -> PendingSelection {
        self.applier.apply(title)
    }
}

/// Hooks the picker needs from the host shutdown dialog.
pub trait ShutdownDialog {
    /// Render the picker with `entries`, an empty slice means nothing to offer.
    fn on_buttons_needed(&mut self, entries: &[BootEntry]);

    /// The picker was dismissed without cancelling the dialog.
    fn on_menu_closed(&mut self) {}

    fn on_cancel(&mut self);

    /// Resume the reboot which was paused while the user picked an entry.
    fn confirm_reboot(&mut self) -> Result<()>;
}

pub enum MenuState {
    Closed,
    Open(Vec<BootEntry>),
    Applying {
        entries: Vec<BootEntry>,
        pending: PendingSelection,
    },
}

pub enum ActivationState {
    Inactive,
    Active(MenuState),
}

pub struct Session<D> {
    service: BootTargetService,
    dialog: D,
    state: ActivationState,
}

impl<D: ShutdownDialog> Session<D> {
    pub fn new(service: BootTargetService, dialog: D) -> Self {
        Self {
            service,
            dialog,
            state: ActivationState::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ActivationState::Active(_))
    }

    pub fn entries(&self) -> Option<&[BootEntry]> {
        match &self.state {
            ActivationState::Active(MenuState::Open(entries)) => Some(entries.as_slice()),
            _ => None,
        }
    }

    pub fn install(&mut self) {
        if let ActivationState::Inactive = self.state {
            debug!("Installing boot entry picker");
            self.state = ActivationState::Active(MenuState::Closed);
        }
    }

    /// Drops any open menu. An outstanding apply keeps running but its
    /// result is discarded.
    pub fn uninstall(&mut self) {
        if self.is_active() {
            debug!("Uninstalling boot entry picker");
            self.state = ActivationState::Inactive;
        }
    }

    fn discover_entries(&self) -> Vec<BootEntry> {
        match self.service.discover_entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("{:#}", anyhow::Error::from(e));
                Vec::new()
            }
        }
    }

    /// Opens the picker with freshly discovered entries, or closes it.
    pub fn toggle_menu(&mut self) -> Result<()> {
        match &self.state {
            ActivationState::Inactive => {
                bail!("Boot entry picker is not installed");
            }
            ActivationState::Active(MenuState::Closed) => {
                let entries = self.discover_entries();
                self.dialog.on_buttons_needed(&entries);
                self.state = ActivationState::Active(MenuState::Open(entries));
            }
            ActivationState::Active(MenuState::Open(_)) => {
                self.state = ActivationState::Active(MenuState::Closed);
                self.dialog.on_menu_closed();
            }
            ActivationState::Active(MenuState::Applying { pending, .. }) => {
                debug!("Still applying \"{}\"", pending.title());
            }
        }

        Ok(())
    }

    pub fn pick(&mut self, title: &str) -> Result<()> {
        let entries = match mem::replace(&mut self.state, ActivationState::Inactive) {
            ActivationState::Active(MenuState::Open(entries)) => entries,
            other => {
                self.state = other;
                bail!("Boot entry picker is not open");
            }
        };
        if !entries.iter().any(|entry| entry.title == title) {
            self.state = ActivationState::Active(MenuState::Open(entries));
            bail!("Boot entry \"{}\" does not exist", title);
        }

        info!("Setting next boot entry to \"{}\"...", title);
        let pending = self.service.apply(title);
        self.state = ActivationState::Active(MenuState::Applying { entries, pending });

        Ok(())
    }

    fn complete(&mut self, entries: Vec<BootEntry>, result: SelectionResult) -> Result<()> {
        if result.succeeded {
            self.state = ActivationState::Active(MenuState::Closed);
            self.dialog.on_menu_closed();
            return self.dialog.confirm_reboot();
        }

        self.dialog.on_buttons_needed(&entries);
        self.state = ActivationState::Active(MenuState::Open(entries));

        Ok(())
    }

    /// Checks an outstanding apply without blocking.
    ///
    /// On success the reboot is resumed, on failure the picker is shown
    /// again with the same entries.
    pub fn poll(&mut self) -> Result<Option<SelectionResult>> {
        let result = match &self.state {
            ActivationState::Active(MenuState::Applying { pending, .. }) => pending.try_result(),
            _ => None,
        };
        let result = match result {
            Some(result) => result,
            None => return Ok(None),
        };

        if let ActivationState::Active(MenuState::Applying { entries, .. }) =
            mem::replace(&mut self.state, ActivationState::Inactive)
        {
            self.complete(entries, result)?;
        }

        Ok(Some(result))
    }

    /// Blocking variant of [`Session::poll`].
    pub fn wait(&mut self) -> Result<Option<SelectionResult>> {
        match mem::replace(&mut self.state, ActivationState::Inactive) {
            ActivationState::Active(MenuState::Applying { entries, pending }) => {
                let result = pending.wait();
                self.complete(entries, result)?;

                Ok(Some(result))
            }
            other => {
                self.state = other;
                Ok(None)
            }
        }
    }

    /// Closes the picker and cancels the dialog. An outstanding apply keeps
    /// running, its result no longer resumes the reboot.
    pub fn cancel(&mut self) {
        if let ActivationState::Active(menu) = &mut self.state {
            *menu = MenuState::Closed;
        }
        self.dialog.on_cancel();
    }
}
