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

use anyhow::Context;
use base64::Engine;

/// Decrypts one `{...}`-wrapped credential token. Implementations may call
/// out to a keyring or master password; the shipped one only de-obfuscates
/// base64.
pub trait CredentialCipher: Send + Sync {
    fn decrypt(&self, token: &str) -> anyhow::Result<String>;
}

pub struct Base64Cipher;

impl CredentialCipher for Base64Cipher {
    fn decrypt(&self, token: &str) -> anyhow::Result<String> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(token)
            .context("invalid base64 in credential token")?;
        String::from_utf8(bytes).context("credential token is not valid UTF-8")
    }
}
