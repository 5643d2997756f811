use std::path::Path;
use std::sync::Arc;

use assetpipe::config::{ConfigFile, Patterns, RawConfigFile};
use assetpipe::fs::FileSystem;
use assetpipe::tasks::BuildContext;
use assetpipe::types::Env;

use crate::recording_notifier::RecordingNotifier;

/// Builder for `ConfigFile` rooted at a fixed directory.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    /// Defaults with `root` set to `root` (a tempdir or a mock path).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            config: RawConfigFile {
                root: root.as_ref().to_string_lossy().into_owned(),
                ..RawConfigFile::default()
            },
        }
    }

    pub fn env(mut self, env: Env) -> Self {
        self.config.env = env;
        self
    }

    pub fn css_src(mut self, patterns: &[&str]) -> Self {
        self.config.css.paths.src = Patterns::new(patterns.iter().copied());
        self
    }

    pub fn js_src(mut self, patterns: &[&str]) -> Self {
        self.config.js.paths.src = Patterns::new(patterns.iter().copied());
        self
    }

    /// Bundler program plus its leading arguments; env-specific args are cleared.
    pub fn bundler(mut self, program: &str, args: &[&str]) -> Self {
        self.config.js.bundler = program.to_string();
        self.config.js.args = args.iter().map(|s| s.to_string()).collect();
        self.config.js.dev_args.clear();
        self.config.js.prod_args.clear();
        self
    }

    pub fn browsers(mut self, query: &str) -> Self {
        self.config.css.browsers = query.to_string();
        self
    }

    /// Proxy upstream and listen port of the dev server (`0` picks a free one).
    pub fn serve(mut self, proxy: &str, port: u16) -> Self {
        self.config.serve.proxy = proxy.to_string();
        self.config.serve.port = port;
        self
    }

    pub fn raw(&self) -> &RawConfigFile {
        &self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Build a context over `fs` that records notifications.
pub fn test_context(
    cfg: ConfigFile,
    env: Env,
    fs: Arc<dyn FileSystem>,
) -> (BuildContext, RecordingNotifier) {
    let notifier = RecordingNotifier::new();
    let ctx = BuildContext::new(env, Arc::new(cfg), fs, Arc::new(notifier.clone()));
    (ctx, notifier)
}
