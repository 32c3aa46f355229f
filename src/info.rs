use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{CONFIG_FILE, Config};
use crate::corpus::Corpus;

/// Output the comprehensive docmend reference document.
pub fn run(json: bool) {
    let root = PathBuf::from(".");
    let state = gather_state(&root);

    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
}

// ── State gathering ───────────────────────────────────────────────────

struct CurrentState {
    config_error: Option<String>,
    config_found: bool,
    docs_dir: String,
    documents: Option<usize>,
    repository: Option<String>,
    rules: Vec<(String, String)>,
    source_root: String,
}

fn gather_state(root: &Path) -> CurrentState {
    let config_found = root.join(CONFIG_FILE).exists();

    match Config::load(root) {
        Err(e) => CurrentState {
            config_error: Some(e.to_string()),
            config_found,
            docs_dir: String::new(),
            documents: None,
            repository: None,
            rules: Vec::new(),
            source_root: String::new(),
        },
        Ok(config) => {
            let documents = Corpus::load(&root.join(&config.docs_dir)).ok().map(|c| c.len());
            CurrentState {
                config_error: None,
                config_found,
                docs_dir: config.docs_dir.display().to_string(),
                documents,
                repository: config.repository.as_ref().map(|t| t.repo_url().to_string()),
                rules: config
                    .classifier
                    .rules()
                    .map(|r| (r.pattern.clone(), r.category.clone()))
                    .collect(),
                source_root: config.source_root,
            }
        },
    }
}

// ── Markdown output ───────────────────────────────────────────────────

fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
}

fn print_markdown_header(version: &str) {
    print!(
        "\
# docmend {version}

Structural extraction for C# sources and link repair for generated markdown
documentation. Declarations are recovered with anchored regexes plus
brace-depth scanning; broken intra-corpus links and source URLs are repaired
against the real document inventory and checkout.

## Commands

    docmend extract [--compact]            Print the classified declaration model as JSON
    docmend classify <PATH>                Show which rule a source path falls under
    docmend inventory [--json]             List heading anchors and the entity map
    docmend resolve                        Repair links in the docs corpus in place
    docmend resolve --out <DIR>            Write the repaired corpus elsewhere
    docmend resolve --check                Report documents needing repair (exit 1)
    docmend info [--json]                  This reference

Global: `--verbose` enables info-level logs (otherwise `RUST_LOG`, default `warn`).

## Link Repair Order

    exact path -> percent-decoded -> root-relative -> duplicate segment collapse
    -> file-name match -> alias table -> entity (label, anchor, file stem)
    -> demote to plain text

## Configuration (.docmend.toml)

    [source]
    root = \"src\"                          # tree to extract from
    extensions = [\"*.cs\"]                 # file-name globs
    exclude_folders = [\"bin\", \"obj\"]      # directory-name globs
    exclude_files = [\"*.Designer.cs\"]     # file-name globs

    [docs]
    dir = \"docs\"                          # generated corpus

    [repository]
    url = \"https://github.com/org/repo\"   # enables source URL repair
    branch = \"main\"
    source_url_format = \"{{repo_url}}/blob/{{branch}}/{{file_path}}#L{{line}}\"

    [resolver]
    source_root = \"src\"                   # subtree indexed by file name
    source_extensions = [\"cs\"]
    skip_dirs = [\"bin\", \"obj\", \"node_modules\"]

    [[classification_rules]]
    pattern = \"CommandHandler\\\\.cs$\"
    category = \"command_handler\"
    doc_file = \"Commands.md\"
    doc_title = \"Commands\"

## Current State

"
    );
}

fn print_markdown_state(state: &CurrentState) {
    if let Some(error) = &state.config_error {
        println!("Config:     {CONFIG_FILE} (invalid: {error})");
        return;
    }
    if state.config_found {
        println!("Config:     {CONFIG_FILE} (found)");
    } else {
        println!("Config:     {CONFIG_FILE} (not found, using defaults)");
    }

    println!("Source:     {}", state.source_root);
    match state.documents {
        Some(n) => println!("Docs:       {} ({n} documents)", state.docs_dir),
        None => println!("Docs:       {} (not found)", state.docs_dir),
    }
    match &state.repository {
        Some(url) => println!("Repository: {url}"),
        None => println!("Repository: (none, source URL repair disabled)"),
    }

    if state.rules.is_empty() {
        println!("Rules:      (none, everything is `other`)");
    } else {
        let rule_list = state
            .rules
            .iter()
            .map(|(pattern, category)| format!("{pattern} -> {category}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Rules:      {rule_list}");
    }
}

fn print_markdown_exit_codes() {
    print!(
        "\
## Exit Codes

| Code | Meaning |
|------|---------|
| 0    | Success / corpus clean |
| 1    | `resolve --check` found documents needing repair |
| 2    | Configuration or runtime error |
"
    );
}

// ── JSON output ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct InfoJson {
    commands: Vec<CommandInfo>,
    current_state: StateJson,
    exit_codes: Vec<ExitCodeInfo>,
    version: String,
}

#[derive(Serialize)]
struct CommandInfo {
    description: String,
    usage: String,
}

#[derive(Serialize)]
struct ExitCodeInfo {
    code: u8,
    meaning: String,
}

#[derive(Serialize)]
struct StateJson {
    config_error: Option<String>,
    config_found: bool,
    docs_dir: String,
    documents: Option<usize>,
    repository: Option<String>,
    rules: Vec<RuleJson>,
    source_root: String,
}

#[derive(Serialize)]
struct RuleJson {
    category: String,
    pattern: String,
}

fn command(usage: &str, description: &str) -> CommandInfo {
    CommandInfo { description: description.to_string(), usage: usage.to_string() }
}

fn print_json(state: &CurrentState) {
    let info = InfoJson {
        commands: vec![
            command(
                "docmend extract [--compact]",
                "Print the classified declaration model as JSON",
            ),
            command("docmend classify <PATH>", "Show which rule a source path falls under"),
            command("docmend inventory [--json]", "List heading anchors and the entity map"),
            command("docmend resolve [--check] [--out <DIR>]", "Repair links in the docs corpus"),
            command("docmend info [--json]", "Print this reference"),
        ],
        current_state: StateJson {
            config_error: state.config_error.clone(),
            config_found: state.config_found,
            docs_dir: state.docs_dir.clone(),
            documents: state.documents,
            repository: state.repository.clone(),
            rules: state
                .rules
                .iter()
                .map(|(pattern, category)| RuleJson {
                    category: category.clone(),
                    pattern: pattern.clone(),
                })
                .collect(),
            source_root: state.source_root.clone(),
        },
        exit_codes: vec![
            ExitCodeInfo { code: 0, meaning: "Success / corpus clean".to_string() },
            ExitCodeInfo {
                code: 1,
                meaning: "resolve --check found documents needing repair".to_string(),
            },
            ExitCodeInfo { code: 2, meaning: "Configuration or runtime error".to_string() },
        ],
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
}
