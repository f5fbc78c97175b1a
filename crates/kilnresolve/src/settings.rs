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

//! Effective-settings resolution: global/user merging, validation,
//! credential decryption and reload notification.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use kilnutil::artifact::ArtifactCoordinate;
use kilnutil::kiln_dir;
use kilnutil::settings::{EffectiveSettings, ProxySpec, RawSettings, ServerCredential};

use crate::cipher::{Base64Cipher, CredentialCipher};
use crate::loader::{JsonSettingsLoader, SettingsLoader, SettingsProblem};

/// Settings could not be built. Carries every problem found across both
/// files so diagnostics aggregate instead of stopping at the first.
#[derive(Debug)]
pub struct SettingsError(pub Vec<SettingsProblem>);

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for problem in &self.0 {
            writeln!(f, "{}", problem)?;
        }
        Ok(())
    }
}

impl std::error::Error for SettingsError {}

/// Notified synchronously, in registration order, whenever settings are
/// reloaded. A failing listener is logged and does not abort the rest.
pub trait SettingsChangeListener: Send + Sync {
    fn settings_changed(&self, settings: &EffectiveSettings) -> anyhow::Result<()>;
}

/// Notified when an artifact is materialized into the local repository.
pub trait LocalRepositoryListener: Send + Sync {
    fn artifact_installed(&self, local_repo: &Path, coordinate: &ArtifactCoordinate, path: &Path);
}

#[derive(Default)]
struct SettingsPaths {
    global: Option<PathBuf>,
    user: Option<PathBuf>,
}

/// Loads and merges global/user configuration into one effective settings
/// snapshot, on demand. Thread-safe; listener registration and notification
/// may race with reloads.
pub struct SettingsResolver {
    paths: RwLock<SettingsPaths>,
    loader: Box<dyn SettingsLoader>,
    cipher: Box<dyn CredentialCipher>,
    settings_listeners: RwLock<Vec<Arc<dyn SettingsChangeListener>>>,
    local_repo_listeners: RwLock<Vec<Arc<dyn LocalRepositoryListener>>>,
}

impl Default for SettingsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsResolver {
    pub fn new() -> Self {
        SettingsResolver {
            paths: RwLock::new(SettingsPaths::default()),
            loader: Box::new(JsonSettingsLoader),
            cipher: Box::new(Base64Cipher),
            settings_listeners: RwLock::new(Vec::new()),
            local_repo_listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn SettingsLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_cipher(mut self, cipher: Box<dyn CredentialCipher>) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn with_settings_files(self, global: Option<&Path>, user: Option<&Path>) -> Self {
        {
            let mut paths = self.paths.write().unwrap();
            paths.global = global.map(Path::to_path_buf);
            paths.user = user.map(Path::to_path_buf);
        }
        self
    }

    pub fn settings_files(&self) -> (Option<PathBuf>, Option<PathBuf>) {
        let paths = self.paths.read().unwrap();
        (paths.global.clone(), paths.user.clone())
    }

    /// Point the resolver at new settings files and reload, notifying
    /// listeners of the change.
    pub fn set_settings_files(
        &self,
        global: Option<&Path>,
        user: Option<&Path>,
    ) -> Result<EffectiveSettings, SettingsError> {
        {
            let mut paths = self.paths.write().unwrap();
            paths.global = global.map(Path::to_path_buf);
            paths.user = user.map(Path::to_path_buf);
        }
        self.reload()
    }

    /// The merged snapshot for the currently configured settings files.
    pub fn effective_settings(&self) -> Result<EffectiveSettings, SettingsError> {
        let (global, user) = self.settings_files();
        self.build_settings(global.as_deref(), user.as_deref())
    }

    /// Merge explicit global/user files, independent of the configured paths.
    pub fn build_settings(
        &self,
        global: Option<&Path>,
        user: Option<&Path>,
    ) -> Result<EffectiveSettings, SettingsError> {
        let mut problems = Vec::new();
        let global = self.parse_collecting(global, &mut problems);
        let user = self.parse_collecting(user, &mut problems);
        if !problems.is_empty() {
            return Err(SettingsError(problems));
        }
        Ok(EffectiveSettings::merge(global, user))
    }

    fn parse_collecting(
        &self,
        file: Option<&Path>,
        problems: &mut Vec<SettingsProblem>,
    ) -> RawSettings {
        match self.loader.parse(file) {
            Ok(raw) => raw,
            Err(found) => {
                problems.extend(found);
                RawSettings::default()
            }
        }
    }

    /// Parse without raising: collects problems so partial/broken settings
    /// can still surface diagnostics.
    pub fn validate(&self, path: &Path) -> Vec<SettingsProblem> {
        if !path.is_file() {
            return vec![SettingsProblem::new(
                Some(path),
                "can not read settings file",
            )];
        }
        match self.loader.parse(Some(path)) {
            Ok(_) => Vec::new(),
            Err(problems) => problems,
        }
    }

    /// Best-effort credential decryption. Only `{...}`-wrapped passwords are
    /// considered encrypted; on failure the credential is returned with the
    /// password undecrypted and a warning is logged, never an error.
    pub fn decrypt(&self, server: &ServerCredential) -> ServerCredential {
        let mut server = server.clone();
        let Some(password) = &server.password else {
            return server;
        };
        let Some(token) = password
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        else {
            return server;
        };
        match self.cipher.decrypt(token) {
            Ok(plain) => server.password = Some(plain),
            Err(err) => {
                log::warn!("could not decrypt password for server `{}`: {err}", server.id);
            }
        }
        server
    }

    /// Rebuild the effective settings and notify settings listeners
    /// synchronously, in registration order. Notification iterates a
    /// snapshot, so a listener added mid-notification is not invoked in
    /// this round.
    pub fn reload(&self) -> Result<EffectiveSettings, SettingsError> {
        let settings = self.effective_settings()?;
        let listeners: Vec<_> = self.settings_listeners.read().unwrap().clone();
        for listener in listeners {
            if let Err(err) = listener.settings_changed(&settings) {
                log::warn!("settings change listener failed: {err}");
            }
        }
        Ok(settings)
    }

    pub fn add_settings_listener(&self, listener: Arc<dyn SettingsChangeListener>) {
        self.settings_listeners.write().unwrap().push(listener);
    }

    pub fn remove_settings_listener(&self, listener: &Arc<dyn SettingsChangeListener>) {
        self.settings_listeners
            .write()
            .unwrap()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    pub fn add_local_repository_listener(&self, listener: Arc<dyn LocalRepositoryListener>) {
        self.local_repo_listeners.write().unwrap().push(listener);
    }

    pub fn remove_local_repository_listener(&self, listener: &Arc<dyn LocalRepositoryListener>) {
        self.local_repo_listeners
            .write()
            .unwrap()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Stable snapshot of the registered local-repository listeners.
    pub fn local_repository_listeners(&self) -> Vec<Arc<dyn LocalRepositoryListener>> {
        self.local_repo_listeners.read().unwrap().clone()
    }

    /// The local repository root. Falls back to the per-user default when
    /// settings are unreadable or silent, so resolution can proceed from
    /// whatever is cached locally.
    pub fn local_repository(&self) -> PathBuf {
        match self.effective_settings() {
            Ok(settings) => settings
                .local_repository
                .unwrap_or_else(kiln_dir::local_repository),
            Err(err) => {
                log::warn!("using default local repository, settings unreadable: {err}");
                kiln_dir::local_repository()
            }
        }
    }

    /// First active proxy for `protocol` from the current settings.
    pub fn proxy_for(&self, protocol: &str) -> Option<ProxySpec> {
        self.effective_settings()
            .ok()?
            .proxy_for(protocol)
            .cloned()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use base64::Engine;

    use super::*;

    fn write_settings(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn merges_global_and_user_files() {
        let dir = tempfile::tempdir().unwrap();
        let global = write_settings(
            dir.path(),
            "global.json",
            r#"{"localRepository": "/global/repo", "activeProfiles": ["base"]}"#,
        );
        let user = write_settings(
            dir.path(),
            "user.json",
            r#"{"localRepository": "/user/repo", "activeProfiles": ["extra"]}"#,
        );
        let resolver = SettingsResolver::new().with_settings_files(Some(&global), Some(&user));
        let settings = resolver.effective_settings().unwrap();
        assert_eq!(settings.local_repository.as_deref(), Some(Path::new("/user/repo")));
        assert_eq!(settings.active_profiles, ["extra", "base"]);
    }

    #[test]
    fn collects_problems_from_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let global = write_settings(dir.path(), "global.json", "{broken");
        let user = write_settings(dir.path(), "user.json", "[also broken]");
        let resolver = SettingsResolver::new().with_settings_files(Some(&global), Some(&user));
        let err = resolver.effective_settings().unwrap_err();
        assert_eq!(err.0.len(), 2);
    }

    #[test]
    fn validate_reports_unreadable_file() {
        let resolver = SettingsResolver::new();
        let problems = resolver.validate(Path::new("/no/such/settings.json"));
        assert_eq!(problems.len(), 1);
        assert!(problems[0].message.contains("can not read"));
    }

    #[test]
    fn decrypt_is_best_effort() {
        let resolver = SettingsResolver::new();
        let token = base64::engine::general_purpose::STANDARD.encode("secret");
        let server = ServerCredential {
            id: "deploy".into(),
            username: Some("ci".into()),
            password: Some(format!("{{{token}}}")),
        };
        assert_eq!(resolver.decrypt(&server).password.as_deref(), Some("secret"));

        // plain passwords pass through untouched
        let plain = ServerCredential {
            password: Some("plain".into()),
            ..server.clone()
        };
        assert_eq!(resolver.decrypt(&plain).password.as_deref(), Some("plain"));

        // undecryptable tokens degrade to the original value
        let broken = ServerCredential {
            password: Some("{%%%}".into()),
            ..server
        };
        assert_eq!(resolver.decrypt(&broken).password.as_deref(), Some("{%%%}"));
    }

    struct RecordingListener {
        name: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl SettingsChangeListener for RecordingListener {
        fn settings_changed(&self, _settings: &EffectiveSettings) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(self.name);
            if self.fail {
                anyhow::bail!("listener {} failed", self.name);
            }
            Ok(())
        }
    }

    #[test]
    fn reload_notifies_listeners_in_order_despite_failures() {
        let resolver = SettingsResolver::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::new(RecordingListener {
            name: "first",
            seen: Arc::clone(&seen),
            fail: true,
        });
        let second = Arc::new(RecordingListener {
            name: "second",
            seen: Arc::clone(&seen),
            fail: false,
        });
        resolver.add_settings_listener(first);
        resolver.add_settings_listener(Arc::clone(&second) as Arc<dyn SettingsChangeListener>);
        resolver.reload().unwrap();
        assert_eq!(*seen.lock().unwrap(), ["first", "second"]);

        let second: Arc<dyn SettingsChangeListener> = second;
        resolver.remove_settings_listener(&second);
        resolver.reload().unwrap();
        assert_eq!(*seen.lock().unwrap(), ["first", "second", "first"]);
    }

    #[test]
    fn local_repository_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let user = write_settings(dir.path(), "user.json", r#"{"localRepository": "/data/repo"}"#);
        let resolver = SettingsResolver::new().with_settings_files(None, Some(&user));
        assert_eq!(resolver.local_repository(), PathBuf::from("/data/repo"));

        let resolver = SettingsResolver::new();
        // silent settings fall through to ~/.kiln/repository
        assert!(resolver.local_repository().ends_with("repository"));
    }
}
