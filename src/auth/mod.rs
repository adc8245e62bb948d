/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
pub mod authenticator;
pub mod session;
pub mod state;

pub use crate::ksv::{Ksv, bksv_is_valid};
pub use authenticator::{Authenticator, Step};
pub use session::HdcpSession;
pub use state::{Action, AuthState, Event, Transition, transition};
