// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub(crate) mod pool;
pub(crate) mod waiter;

pub use pool::WaiterPool;
pub use waiter::Waiter;
