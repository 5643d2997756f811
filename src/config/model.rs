// src/config/model.rs

use std::ops::Deref;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{Env, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// Every section is optional; a missing section falls back to the stock
/// project layout below. A section that *is* present must spell out at least
/// its `src` and `dst`.
///
/// ```toml
/// env = "dev"
/// root = "."
/// src = "src"
/// dst = "dist"
///
/// [css]
/// src = ["css/style.css"]
/// watch = "css/**/*.css"
/// dst = "css"
/// browsers = "last 5 versions"
///
/// [sprites]
/// src = "sprites/**/*.svg"
/// base = "sprites"
/// dst = "images"
/// ```
///
/// All category patterns are relative to `<root>/<src>`, and all category
/// destinations are relative to `<root>/<dst>`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Mode used by single-task invocations; `build` always forces `prod`.
    #[serde(default)]
    pub env: Env,

    #[serde(default = "default_root")]
    pub root: String,

    #[serde(default = "default_src")]
    pub src: String,

    #[serde(default = "default_dst")]
    pub dst: String,

    #[serde(default = "default_images")]
    pub images: ImagesConfig,

    #[serde(default = "default_files")]
    pub files: CategoryConfig,

    #[serde(default = "default_templates")]
    pub templates: CategoryConfig,

    #[serde(default = "default_js")]
    pub js: ScriptsConfig,

    #[serde(default = "default_css")]
    pub css: StylesConfig,

    #[serde(default = "default_sprites")]
    pub sprites: SpritesConfig,

    #[serde(default)]
    pub serve: ServeSection,

    #[serde(default)]
    pub notify: NotifySection,

    #[serde(default)]
    pub runtime: RuntimeSection,
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            env: Env::default(),
            root: default_root(),
            src: default_src(),
            dst: default_dst(),
            images: default_images(),
            files: default_files(),
            templates: default_templates(),
            js: default_js(),
            css: default_css(),
            sprites: default_sprites(),
            serve: ServeSection::default(),
            notify: NotifySection::default(),
            runtime: RuntimeSection::default(),
        }
    }
}

/// One glob pattern or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct Patterns(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Patterns {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(p) => Patterns(vec![p]),
            OneOrMany::Many(ps) => Patterns(ps),
        }
    }
}

impl Patterns {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Patterns(patterns.into_iter().map(Into::into).collect())
    }

    /// Patterns with any leading `/` removed, so `"/css/*.css"` and
    /// `"css/*.css"` mean the same thing.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|p| trim_slashes(p))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Paths shared by every asset category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    /// Source glob(s), relative to the source root.
    pub src: Patterns,

    /// Glob the watcher uses; falls back to `src` when absent.
    #[serde(default)]
    pub watch: Option<String>,

    /// Directory (relative to the source root) whose structure is preserved
    /// in the destination. Defaults to the source root itself.
    #[serde(default)]
    pub base: Option<String>,

    /// Destination directory relative to the global `dst`.
    pub dst: String,
}

impl CategoryConfig {
    fn new(src: &[&str], watch: Option<&str>, base: Option<&str>, dst: &str) -> Self {
        Self {
            src: Patterns::new(src.iter().copied()),
            watch: watch.map(str::to_string),
            base: base.map(str::to_string),
            dst: dst.to_string(),
        }
    }

    /// Effective watch patterns.
    pub fn watch_patterns(&self) -> Vec<String> {
        match &self.watch {
            Some(w) => vec![trim_slashes(w).to_string()],
            None => self.src.iter().map(str::to_string).collect(),
        }
    }
}

/// `[js]`: script entries plus the external bundler invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsConfig {
    #[serde(flatten)]
    pub paths: CategoryConfig,

    /// Bundler program, looked up on `PATH`.
    #[serde(default = "default_bundler")]
    pub bundler: String,

    /// Arguments passed on every invocation.
    #[serde(default = "default_bundler_args")]
    pub args: Vec<String>,

    /// Extra arguments in `dev` mode (source maps).
    #[serde(default = "default_bundler_dev_args")]
    pub dev_args: Vec<String>,

    /// Extra arguments in `prod` mode (minification).
    #[serde(default = "default_bundler_prod_args")]
    pub prod_args: Vec<String>,

    /// Flag used to name the output file, joined as `<flag>=<path>`.
    #[serde(default = "default_outfile_flag")]
    pub outfile_flag: String,
}

/// `[css]`: stylesheet entries plus the browser support range.
#[derive(Debug, Clone, Deserialize)]
pub struct StylesConfig {
    #[serde(flatten)]
    pub paths: CategoryConfig,

    /// Browserslist query the CSS transforms target.
    #[serde(default = "default_browsers")]
    pub browsers: String,
}

/// `[images]`: raster/vector images plus remote compression settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    #[serde(flatten)]
    pub paths: CategoryConfig,

    /// API token for the remote compression service. Overridden by
    /// `ASSETPIPE_COMPRESSION_KEY`.
    #[serde(default)]
    pub compression_key: Option<String>,

    #[serde(default = "default_compression_endpoint")]
    pub compression_endpoint: String,
}

impl ImagesConfig {
    /// Effective compression key (environment first, then config).
    pub fn effective_compression_key(&self) -> Option<String> {
        std::env::var("ASSETPIPE_COMPRESSION_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.compression_key.clone())
    }
}

/// `[sprites]`: SVG icons collapsed into one symbol sprite.
#[derive(Debug, Clone, Deserialize)]
pub struct SpritesConfig {
    #[serde(flatten)]
    pub paths: CategoryConfig,

    /// Output filename inside the sprites destination.
    #[serde(default = "default_sprite_name")]
    pub sprite: String,
}

/// `[serve]`: the live-reload proxy.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    /// Upstream host (and optional port) requests are proxied to.
    #[serde(default = "default_proxy")]
    pub proxy: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Accepted for compatibility; the browser is never opened.
    #[serde(default)]
    pub open: bool,

    /// Accepted for compatibility; no in-page notifications are shown.
    #[serde(default)]
    pub notify: bool,
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            proxy: default_proxy(),
            port: default_port(),
            open: false,
            notify: false,
        }
    }
}

/// `[notify]`: how compile errors reach the developer.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotifySection {
    /// Command prefix for desktop notifications, e.g. `["notify-send"]`.
    /// Title and message are appended as two arguments.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

/// `[runtime]`: behaviour of watch-triggered runs.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSection {
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued runs to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}

fn default_root() -> String {
    ".".to_string()
}

fn default_src() -> String {
    "src".to_string()
}

fn default_dst() -> String {
    "dist".to_string()
}

fn default_images() -> ImagesConfig {
    ImagesConfig {
        paths: CategoryConfig::new(
            &["images/**/*.{jpg,png,svg,gif}", "images/favicons/**/*.*"],
            Some("images/**/*.*"),
            Some("images"),
            "images",
        ),
        compression_key: None,
        compression_endpoint: default_compression_endpoint(),
    }
}

fn default_files() -> CategoryConfig {
    CategoryConfig::new(&["files/**/*.*"], None, Some("files"), "files")
}

fn default_templates() -> CategoryConfig {
    CategoryConfig::new(
        &["**/*.{php,html,tpl,json}", "**/.htaccess"],
        Some("**/*.{php,html,tpl,json}"),
        None,
        "",
    )
}

fn default_js() -> ScriptsConfig {
    ScriptsConfig {
        paths: CategoryConfig::new(&["js/scripts.js"], Some("js/**/*.{js,jsx}"), None, "js"),
        bundler: default_bundler(),
        args: default_bundler_args(),
        dev_args: default_bundler_dev_args(),
        prod_args: default_bundler_prod_args(),
        outfile_flag: default_outfile_flag(),
    }
}

fn default_css() -> StylesConfig {
    StylesConfig {
        paths: CategoryConfig::new(&["css/style.css"], Some("css/**/*.css"), None, "css"),
        browsers: default_browsers(),
    }
}

fn default_sprites() -> SpritesConfig {
    SpritesConfig {
        paths: CategoryConfig::new(&["sprites/**/*.svg"], None, Some("sprites"), "images"),
        sprite: default_sprite_name(),
    }
}

fn default_bundler() -> String {
    "esbuild".to_string()
}

fn default_bundler_args() -> Vec<String> {
    vec![
        "--bundle".to_string(),
        "--target=es2015".to_string(),
        "--loader:.js=jsx".to_string(),
    ]
}

fn default_bundler_dev_args() -> Vec<String> {
    vec!["--sourcemap=inline".to_string()]
}

fn default_bundler_prod_args() -> Vec<String> {
    vec!["--minify".to_string()]
}

fn default_outfile_flag() -> String {
    "--outfile".to_string()
}

fn default_browsers() -> String {
    "last 5 versions".to_string()
}

fn default_compression_endpoint() -> String {
    "https://api.tinify.com/shrink".to_string()
}

fn default_sprite_name() -> String {
    "icons.svg".to_string()
}

fn default_proxy() -> String {
    "gulp.dev".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_queue_length() -> usize {
    1
}

/// Validated configuration.
///
/// Obtained through `ConfigFile::try_from(RawConfigFile)` (see
/// `config::validate`); dereferences to the raw sections.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    raw: RawConfigFile,
    /// Directory `root` is resolved against (the config file's directory).
    base_dir: PathBuf,
}

impl Deref for ConfigFile {
    type Target = RawConfigFile;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl ConfigFile {
    /// Construct without validation. Only `config::validate` should call this.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            raw,
            base_dir: PathBuf::from("."),
        }
    }

    /// Resolve `root` against `dir` instead of the working directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn root_dir(&self) -> PathBuf {
        self.base_dir.join(&self.raw.root)
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root_dir().join(trim_slashes(&self.raw.src))
    }

    pub fn dst_dir(&self) -> PathBuf {
        self.root_dir().join(trim_slashes(&self.raw.dst))
    }

    /// Destination directory of a category.
    pub fn category_dst(&self, category: &CategoryConfig) -> PathBuf {
        join_relative(&self.dst_dir(), &category.dst)
    }

    /// Directory whose structure a category preserves when copying.
    pub fn category_base(&self, category: &CategoryConfig) -> PathBuf {
        match &category.base {
            Some(base) => join_relative(&self.src_dir(), base),
            None => self.src_dir(),
        }
    }
}

/// Join a config-relative path, ignoring leading/trailing slashes.
fn join_relative(dir: &Path, rel: &str) -> PathBuf {
    let rel = trim_slashes(rel);
    if rel.is_empty() {
        dir.to_path_buf()
    } else {
        dir.join(rel)
    }
}

pub(crate) fn trim_slashes(s: &str) -> &str {
    s.trim_matches('/')
}
