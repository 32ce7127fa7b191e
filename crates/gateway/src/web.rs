//! UI shell and static files.

use std::path::{Component, Path, PathBuf};

use handlebars::Handlebars;
use scangate_common::{naming, Language, Timestamp};
use scangate_scan_config::ScanDefaults;
use serde::Serialize;

use crate::config::StartupError;

const INDEX_TEMPLATE_NAME: &str = "index";

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="{{language}}">
<head>
    <meta charset="utf-8">
    <title>ScanGate</title>
    <link rel="stylesheet" href="/css/main.css">
</head>
<body>
    <h1>ScanGate</h1>
    <form id="new-scan" method="post" action="/new/scan">
        <label>Targets <input name="targets" placeholder="192.168.1.1,owasp.org"></label>
        <fieldset>
            <legend>Profiles</legend>
            {{#each profiles}}
            <label title="{{#each methods}}{{this}} {{/each}}"><input type="radio" name="profile" value="{{name}}"> {{name}}</label>
            {{/each}}
        </fieldset>
        <fieldset>
            <legend>Scan methods</legend>
            {{#each methods}}
            <label><input type="checkbox" name="scan_method" value="{{this}}"> {{this}}</label>
            {{/each}}
        </fieldset>
        <label>Graph
            <select name="graph_flag">
                {{#each graphs}}<option value="{{this}}">{{this}}</option>{{/each}}
            </select>
        </label>
        <label>Language
            <select name="language">
                {{#each languages}}<option value="{{this}}">{{this}}</option>{{/each}}
            </select>
        </label>
        <label>Output <input name="log_in_file" value="{{log_in_file}}"></label>
        <button type="submit">Scan</button>
    </form>
    <script src="/js/main.js"></script>
</body>
</html>
"#;

#[derive(Serialize)]
struct ProfileView<'a> {
    name: &'a str,
    methods: &'a [String],
}

#[derive(Serialize)]
struct IndexContext<'a> {
    language: &'a str,
    methods: &'a [String],
    profiles: Vec<ProfileView<'a>>,
    graphs: &'a [String],
    languages: Vec<&'static str>,
    log_in_file: String,
}

/// Renders the UI shell and serves files below an optional web root.
pub struct WebUi {
    root: Option<PathBuf>,
    templates: Handlebars<'static>,
}

impl WebUi {
    pub fn new(root: Option<PathBuf>) -> Result<Self, StartupError> {
        let mut templates = Handlebars::new();
        templates
            .register_template_string(INDEX_TEMPLATE_NAME, INDEX_TEMPLATE)
            .map_err(|e| StartupError::new("ERR_TEMPLATE", e.to_string()))?;
        Ok(Self { root, templates })
    }

    pub fn render_index(
        &self,
        defaults: &ScanDefaults,
        language: Language,
    ) -> Result<String, handlebars::RenderError> {
        let catalog = defaults.catalog();
        let context = IndexContext {
            language: language.code(),
            methods: &catalog.methods,
            profiles: catalog
                .profiles
                .iter()
                .map(|(name, methods)| ProfileView { name, methods })
                .collect(),
            graphs: &catalog.graphs,
            languages: Language::ALL.iter().map(Language::code).collect(),
            log_in_file: naming::results_filename(&Timestamp::now()),
        };
        self.templates.render(INDEX_TEMPLATE_NAME, &context)
    }

    /// Path of a static file, if a web root is configured and the request
    /// path stays inside it.
    pub fn static_path(&self, request_path: &str) -> Option<PathBuf> {
        resolve_under(self.root.as_deref()?, request_path)
    }
}

/// Join `relative` onto `root`, refusing absolute paths and any `..`.
pub fn resolve_under(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }
    let candidate = Path::new(relative);
    if !candidate
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }
    Some(root.join(candidate))
}

/// Content type by file extension; unknown extensions are served as HTML.
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "map" => "application/json",
        _ => "text/html",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_under_rejects_traversal() {
        let root = Path::new("/srv/web");
        assert_eq!(
            resolve_under(root, "/css/main.css"),
            Some(PathBuf::from("/srv/web/css/main.css"))
        );
        assert_eq!(resolve_under(root, "../etc/passwd"), None);
        assert_eq!(resolve_under(root, "css/../../etc/passwd"), None);
        assert_eq!(resolve_under(root, "/"), None);
        assert_eq!(resolve_under(root, ""), None);
    }

    #[test]
    fn test_mime_table() {
        assert_eq!(mime_for(Path::new("a/b.CSS")), "text/css");
        assert_eq!(mime_for(Path::new("app.js")), "application/javascript");
        assert_eq!(mime_for(Path::new("logo.png")), "image/png");
        assert_eq!(mime_for(Path::new("README")), "text/html");
    }

    #[test]
    fn test_render_index_lists_catalog() {
        let ui = WebUi::new(None).unwrap();
        let html = ui.render_index(&ScanDefaults::default(), Language::De).unwrap();

        assert!(html.contains(r#"<html lang="de">"#));
        assert!(html.contains(r#"value="port_scan""#));
        assert!(html.contains(r#"value="brute""#));
        assert!(html.contains("d3_tree_v2_graph"));
        assert!(html.contains("results/results_"));
    }

    #[test]
    fn test_static_path_requires_root() {
        assert!(WebUi::new(None).unwrap().static_path("/a.css").is_none());
        let ui = WebUi::new(Some(PathBuf::from("/srv"))).unwrap();
        assert_eq!(ui.static_path("/a.css"), Some(PathBuf::from("/srv/a.css")));
    }
}
