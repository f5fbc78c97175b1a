// kiln: Build orchestration and classpath engine for JVM projects.
// Copyright (C) 2024 International Digital Economy Academy
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// For inquiries, you can contact us via e-mail at jichuruanjian@idea.edu.cn.

/// Caller-supplied cancellation and progress sink, threaded through
/// long-running resolution and planning calls so in-flight work can be
/// aborted. Cancellation surfaces through the normal error channel, tagged
/// distinctly so callers don't report it as a hard failure.
pub trait ProgressHandle: Send + Sync {
    fn cancelled(&self) -> bool;
    fn message(&self, msg: &str);
}

/// Never cancels, swallows all progress output.
pub struct SilentProgress;

impl ProgressHandle for SilentProgress {
    fn cancelled(&self) -> bool {
        false
    }

    fn message(&self, _msg: &str) {}
}

/// Already-cancelled handle, for tests and shutdown paths.
pub struct CancelledProgress;

impl ProgressHandle for CancelledProgress {
    fn cancelled(&self) -> bool {
        true
    }

    fn message(&self, _msg: &str) {}
}
