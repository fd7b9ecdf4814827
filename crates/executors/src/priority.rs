//! Scheduling priority for launched children.
//!
//! The priority classes follow the Windows model. On Unix each class maps to
//! a nice value applied with `setpriority(2)`; other targets report
//! [`PriorityError::Unsupported`].

use command_group::AsyncGroupChild;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::errors::PriorityError;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Priority {
    Idle,
    #[serde(alias = "BelowNormal")]
    #[strum(to_string = "below_normal", serialize = "belownormal")]
    BelowNormal,
    #[default]
    Normal,
    #[serde(alias = "AboveNormal")]
    #[strum(to_string = "above_normal", serialize = "abovenormal")]
    AboveNormal,
    High,
    Realtime,
}

impl Priority {
    /// Nice value used where the OS has no priority classes.
    pub fn nice_value(self) -> i32 {
        match self {
            Priority::Idle => 19,
            Priority::BelowNormal => 10,
            Priority::Normal => 0,
            Priority::AboveNormal => -5,
            Priority::High => -10,
            Priority::Realtime => -20,
        }
    }

    #[cfg(windows)]
    pub fn priority_class(self) -> windows_sys::Win32::System::Threading::PROCESS_CREATION_FLAGS {
        use windows_sys::Win32::System::Threading::{
            ABOVE_NORMAL_PRIORITY_CLASS, BELOW_NORMAL_PRIORITY_CLASS, HIGH_PRIORITY_CLASS,
            IDLE_PRIORITY_CLASS, NORMAL_PRIORITY_CLASS, REALTIME_PRIORITY_CLASS,
        };

        match self {
            Priority::Idle => IDLE_PRIORITY_CLASS,
            Priority::BelowNormal => BELOW_NORMAL_PRIORITY_CLASS,
            Priority::Normal => NORMAL_PRIORITY_CLASS,
            Priority::AboveNormal => ABOVE_NORMAL_PRIORITY_CLASS,
            Priority::High => HIGH_PRIORITY_CLASS,
            Priority::Realtime => REALTIME_PRIORITY_CLASS,
        }
    }

    /// Apply this priority to a running child.
    ///
    /// A child that has already exited yields
    /// [`PriorityError::ProcessAlreadyExited`]; the caller decides whether
    /// that matters.
    pub fn apply_to(self, child: &mut AsyncGroupChild) -> Result<(), PriorityError> {
        match child.inner().try_wait() {
            Ok(Some(_)) => return Err(PriorityError::ProcessAlreadyExited),
            Ok(None) => {}
            Err(source) => {
                return Err(PriorityError::Os {
                    priority: self,
                    source,
                });
            }
        }
        self.apply_to_running(child)
    }

    #[cfg(unix)]
    fn apply_to_running(self, child: &mut AsyncGroupChild) -> Result<(), PriorityError> {
        let pid = child.id().ok_or(PriorityError::ProcessAlreadyExited)?;
        sys::set_nice(pid, self)
    }

    #[cfg(windows)]
    fn apply_to_running(self, child: &mut AsyncGroupChild) -> Result<(), PriorityError> {
        let handle = child
            .inner()
            .raw_handle()
            .ok_or(PriorityError::ProcessAlreadyExited)?;
        sys::set_priority_class(handle, self)
    }

    #[cfg(not(any(unix, windows)))]
    fn apply_to_running(self, _child: &mut AsyncGroupChild) -> Result<(), PriorityError> {
        Err(PriorityError::Unsupported)
    }
}

#[cfg(unix)]
mod sys {
    use std::io;

    use super::Priority;
    use crate::errors::PriorityError;

    pub(super) fn set_nice(pid: u32, priority: Priority) -> Result<(), PriorityError> {
        // SAFETY: setpriority only takes integers and does not touch our memory.
        let rc = unsafe {
            libc::setpriority(
                libc::PRIO_PROCESS,
                pid as libc::id_t,
                priority.nice_value(),
            )
        };
        if rc == 0 {
            return Ok(());
        }

        let source = io::Error::last_os_error();
        Err(match source.raw_os_error() {
            Some(libc::ESRCH) => PriorityError::ProcessAlreadyExited,
            Some(libc::EACCES) | Some(libc::EPERM) => {
                PriorityError::PermissionDenied { priority, source }
            }
            _ => PriorityError::Os { priority, source },
        })
    }
}

#[cfg(windows)]
mod sys {
    use std::{io, os::windows::io::RawHandle};

    use windows_sys::Win32::{Foundation::ERROR_ACCESS_DENIED, System::Threading::SetPriorityClass};

    use super::Priority;
    use crate::errors::PriorityError;

    pub(super) fn set_priority_class(
        handle: RawHandle,
        priority: Priority,
    ) -> Result<(), PriorityError> {
        // SAFETY: the handle belongs to a child we still own and have not reaped.
        let ok = unsafe { SetPriorityClass(handle as _, priority.priority_class()) };
        if ok != 0 {
            return Ok(());
        }

        let source = io::Error::last_os_error();
        Err(match source.raw_os_error() {
            Some(code) if code as u32 == ERROR_ACCESS_DENIED => {
                PriorityError::PermissionDenied { priority, source }
            }
            _ => PriorityError::Os { priority, source },
        })
    }
}
