// SPDX-License-Identifier: Apache-2.0
pub mod settings;
pub mod template;
pub mod format;
pub mod statement;
pub mod transport;
pub mod dispatch;
pub mod store;
pub mod pacing;
pub mod error;
pub mod logging;
