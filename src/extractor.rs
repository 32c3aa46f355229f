//! Structural extraction from C# source text without a grammar.
//!
//! Regexes only anchor declaration starts and signatures. Anything nested
//! (type bodies, method bodies) is isolated with an explicit brace-depth
//! scan, so a malformed block only costs the declaration that owns it.

use std::collections::HashSet;
use std::ops::Range;

use regex::{Captures, Regex};

use crate::error::Error;
use crate::types::{
    AccessLevel, CallEdge, CallKind, FileRecord, Members, MethodRecord, Parameter,
    PropertyRecord, TypeKind, TypeRecord,
};

/// Kind keywords that the member patterns must never report as a type.
const KIND_KEYWORDS: [&str; 5] = ["class", "enum", "interface", "record", "struct"];

/// Compiled declaration and call patterns, reused for every file.
pub struct Extractor {
    /// `root.member.Method(`
    chain_call: Regex,
    /// `new Type(`
    constructor: Regex,
    /// `receiver.Method(`
    instance_call: Regex,
    /// Method signature: access, modifiers, return type, name, parameter list.
    method: Regex,
    /// First `namespace X.Y` token.
    namespace: Regex,
    /// Property or field: access, modifiers, type, name, then `{`, `=` or `;`.
    property: Regex,
    /// Type declaration up to and including its opening brace.
    type_decl: Regex,
}

impl Extractor {
    /// Recover call edges from an isolated method body.
    ///
    /// Chain calls are taken first. A single-level call is kept only when its
    /// method name starts uppercase and no chain call already captured it;
    /// this deliberately misses lowercase helpers and complex expressions.
    fn call_edges(&self, body: &str) -> Vec<CallEdge> {
        let mut edges = Vec::new();
        let mut seen_chains: HashSet<String> = HashSet::new();
        let mut chained_targets: HashSet<&str> = HashSet::new();

        for caps in self.chain_call.captures_iter(body) {
            let (Some(member), Some(method)) = (caps.name("member"), caps.name("method")) else {
                continue;
            };
            let key = format!("{}.{}", member.as_str(), method.as_str());
            if !seen_chains.insert(key.clone()) {
                continue;
            }
            chained_targets.insert(method.as_str());
            edges.push(CallEdge {
                chain_key: Some(key),
                kind: CallKind::Chain,
                receiver: Some(member.as_str().to_string()),
                target: method.as_str().to_string(),
            });
        }

        let mut seen_methods: HashSet<&str> = HashSet::new();
        for caps in self.instance_call.captures_iter(body) {
            let (Some(receiver), Some(method)) = (caps.name("receiver"), caps.name("method")) else {
                continue;
            };
            let name = method.as_str();
            let looks_public = name.chars().next().is_some_and(char::is_uppercase);
            if !looks_public || chained_targets.contains(name) || !seen_methods.insert(name) {
                continue;
            }
            edges.push(CallEdge {
                chain_key: Some(format!("{}.{name}", receiver.as_str())),
                kind: CallKind::Instance,
                receiver: Some(receiver.as_str().to_string()),
                target: name.to_string(),
            });
        }

        let mut seen_types: HashSet<&str> = HashSet::new();
        for caps in self.constructor.captures_iter(body) {
            let Some(type_name) = caps.name("type") else {
                continue;
            };
            if !seen_types.insert(type_name.as_str()) {
                continue;
            }
            edges.push(CallEdge {
                chain_key: None,
                kind: CallKind::Constructor,
                receiver: None,
                target: type_name.as_str().to_string(),
            });
        }

        return edges;
    }

    /// Turn one file's text into its declaration tree. Never fails: text
    /// that matches nothing yields an empty record.
    pub fn extract(&self, text: &str, path: &str) -> FileRecord {
        let namespace = self
            .namespace
            .captures(text)
            .and_then(|caps| return caps.name("name"))
            .map(|m| return m.as_str().to_string());

        let mut types = Vec::new();
        for caps in self.type_decl.captures_iter(text) {
            if let Some(record) = self.type_record(text, &caps) {
                types.push(record);
            }
        }

        return FileRecord {
            namespace,
            path: path.replace('\\', "/"),
            types,
        };
    }

    /// Extract properties and methods from an isolated type body.
    /// `body_line` is the line holding the type's opening brace.
    fn members(&self, body: &str, body_line: u32) -> Members {
        return Members {
            methods: self.methods(body, body_line),
            properties: self.properties(body, body_line),
        };
    }

    /// Extract method declarations, each with its own brace-isolated body.
    fn methods(&self, body: &str, body_line: u32) -> Vec<MethodRecord> {
        let mut methods = Vec::new();

        for caps in self.method.captures_iter(body) {
            let (Some(whole), Some(name), Some(ret)) =
                (caps.get(0), caps.name("name"), caps.name("return"))
            else {
                continue;
            };
            let return_type = ret.as_str().trim();
            if KIND_KEYWORDS.contains(&return_type) {
                continue;
            }

            let params_raw = caps.name("params").map_or("", |m| return m.as_str()).trim();
            let modifiers = caps.name("modifiers").map_or("", |m| return m.as_str());
            let access = caps.name("access").map_or("", |m| return m.as_str());

            let method_body = body
                .get(whole.end()..)
                .and_then(method_body_start)
                .and_then(|relative| return whole.end().checked_add(relative))
                .and_then(|open| return brace_body(body, open))
                .and_then(|range| return body.get(range))
                .unwrap_or("");

            methods.push(MethodRecord {
                access_level: AccessLevel::from_keyword(access),
                body_text: method_body.to_string(),
                call_edges: if method_body.is_empty() {
                    Vec::new()
                } else {
                    self.call_edges(method_body)
                },
                is_async: modifiers.split_whitespace().any(|m| return m == "async"),
                line_number: body_line.saturating_add(newlines_before(body, whole.start())),
                name: name.as_str().to_string(),
                parameters: parse_parameters(params_raw),
                return_type: return_type.to_string(),
                signature_text: format!("{return_type} {}({params_raw})", name.as_str()),
            });
        }

        return methods;
    }

    /// Compile the pattern table.
    ///
    /// # Errors
    ///
    /// Returns `Error::Regex` if a built-in pattern fails to compile.
    pub fn new() -> Result<Self, Error> {
        return Ok(Self {
            chain_call: Regex::new(
                r"(?P<root>\w+)\s*\.\s*(?P<member>\w+)\s*\.\s*(?P<method>\w+)\s*\(",
            )?,
            constructor: Regex::new(r"\bnew\s+(?P<type>\w+)\s*\(")?,
            instance_call: Regex::new(r"(?P<receiver>\w+)\s*\.\s*(?P<method>\w+)\s*\(")?,
            method: Regex::new(concat!(
                r"\b(?P<access>public|protected|private|internal)",
                r"(?P<modifiers>(?:\s+(?:static|async|virtual|override|sealed|new|abstract",
                r"|extern|unsafe|partial))*)",
                r"\s+(?P<return>[\w<>\[\],\s\?]+?)\s+",
                r"(?P<name>\w+)\s*",
                r"\((?P<params>[^)]*)\)",
            ))?,
            namespace: Regex::new(r"\bnamespace\s+(?P<name>[\w.]+)")?,
            property: Regex::new(concat!(
                r"\b(?P<access>public|protected|private|internal)",
                r"(?:\s+(?:static|readonly|virtual|override|abstract|required|const|new|sealed))*",
                r"\s+(?P<type>[\w<>\[\],\?\s]+?)\s+",
                r"(?P<name>\w+)\s*",
                r"(?:\{|=|;)",
            ))?,
            type_decl: Regex::new(concat!(
                r"\b(?P<access>public|internal|private|protected)",
                r"(?P<modifiers>(?:\s+(?:static|abstract|sealed|partial|readonly))*)",
                r"\s+(?P<kind>class|interface|record|enum)\s+",
                r"(?P<name>\w+)",
                r"(?:\s*<[^<>{]*(?:<[^<>{]*>[^<>{]*)*>)?",
                r"(?:\s*\([^)]*\))?",
                r"(?:\s*:\s*(?P<bases>[^{;]+?))?",
                r"\s*\{",
            ))?,
        });
    }

    /// Extract property and field declarations. Lowercase names are treated
    /// as private fields and skipped; repeated names keep the first sighting.
    fn properties(&self, body: &str, body_line: u32) -> Vec<PropertyRecord> {
        let mut properties = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for caps in self.property.captures_iter(body) {
            let (Some(whole), Some(name), Some(declared)) =
                (caps.get(0), caps.name("name"), caps.name("type"))
            else {
                continue;
            };
            let name = name.as_str();
            let declared_type = declared.as_str().trim();
            // Nested type declarations: `partial class X {` puts the kind after a modifier.
            if declared_type.split_whitespace().any(|word| return KIND_KEYWORDS.contains(&word)) {
                continue;
            }
            if name.chars().next().is_some_and(char::is_lowercase) || !seen.insert(name) {
                continue;
            }
            let access = caps.name("access").map_or("", |m| return m.as_str());
            properties.push(PropertyRecord {
                access_level: AccessLevel::from_keyword(access),
                declared_type: declared_type.to_string(),
                line_number: body_line.saturating_add(newlines_before(body, whole.start())),
                name: name.to_string(),
            });
        }

        return properties;
    }

    /// Build one type record from a declaration match. The members stay
    /// empty when the opening brace never balances.
    fn type_record(&self, text: &str, caps: &Captures<'_>) -> Option<TypeRecord> {
        let whole = caps.get(0)?;
        let name = caps.name("name")?.as_str().to_string();
        let kind = TypeKind::from_keyword(caps.name("kind")?.as_str());
        let access = AccessLevel::from_keyword(caps.name("access")?.as_str());
        let modifiers: Vec<String> = caps
            .name("modifiers")
            .map(|m| return m.as_str().split_whitespace().map(String::from).collect())
            .unwrap_or_default();
        let (base_type, implemented_interfaces) =
            split_base_list(caps.name("bases").map_or("", |m| return m.as_str()));

        let open = whole.end().checked_sub(1)?;
        let body_line = line_at(text, open);
        let members = brace_body(text, open)
            .and_then(|range| return text.get(range))
            .map(|body| return self.members(body, body_line))
            .unwrap_or_default();

        return Some(TypeRecord {
            access_level: access,
            base_type,
            implemented_interfaces,
            kind,
            line_number: line_at(text, whole.start()),
            members,
            modifiers,
            name,
        });
    }
}

/// Isolate the block opened by the `{` at byte offset `open`.
///
/// Depth goes up on `{` and down on `}`; the scan stops when it returns to
/// zero. The returned range excludes both braces. `None` when `open` is not
/// a `{` or the block never closes before the end of the text.
pub fn brace_body(text: &str, open: usize) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }

    let mut depth = 0_usize;
    for (offset, byte) in bytes.iter().enumerate().skip(open) {
        match byte {
            b'{' => depth = depth.saturating_add(1),
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open.saturating_add(1)..offset);
                }
            },
            _ => {},
        }
    }
    return None;
}

/// One-based line number of a byte offset.
fn line_at(text: &str, offset: usize) -> u32 {
    return newlines_before(text, offset).saturating_add(1);
}

/// Offset of the `{` opening a method body, relative to `after_signature`.
/// A `;` or `=>` reached first means the member has no block body.
fn method_body_start(after_signature: &str) -> Option<usize> {
    let mut previous = 0_u8;
    for (offset, byte) in after_signature.bytes().enumerate() {
        match byte {
            b'{' => return Some(offset),
            b';' => return None,
            b'>' if previous == b'=' => return None,
            _ => {},
        }
        previous = byte;
    }
    return None;
}

/// Count `\n` strictly before `offset`.
fn newlines_before(text: &str, offset: usize) -> u32 {
    let preceding = text.get(..offset).unwrap_or(text);
    let count = preceding.bytes().filter(|b| return *b == b'\n').count();
    return u32::try_from(count).unwrap_or(u32::MAX);
}

/// Parse `int id, string name = "x"` into `(type, name)` pairs.
///
/// Default values are dropped; each token is split on its last whitespace
/// boundary. A token with no boundary becomes `(token, "")`.
pub fn parse_parameters(raw: &str) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    for part in split_top_level(raw) {
        let declaration = part.split('=').next().unwrap_or("").trim();
        if declaration.is_empty() {
            continue;
        }
        let parameter = match declaration.rsplit_once(char::is_whitespace) {
            Some((type_name, name)) => Parameter {
                name: name.trim().to_string(),
                type_name: type_name.trim().to_string(),
            },
            None => Parameter {
                name: String::new(),
                type_name: declaration.to_string(),
            },
        };
        parameters.push(parameter);
    }
    return parameters;
}

/// Split a base list into `(base type, interfaces)` by naming convention:
/// `I` followed by an uppercase letter is an interface, the first other
/// name is the base type, anything after that is listed as an interface.
pub fn split_base_list(raw: &str) -> (Option<String>, Vec<String>) {
    let list = raw.split(" where ").next().unwrap_or("");
    let mut base_type = None;
    let mut interfaces = Vec::new();

    for entry in split_top_level(list) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let bare = entry.split('<').next().unwrap_or(entry).trim();
        let mut chars = bare.chars();
        let is_interface = chars.next() == Some('I')
            && chars.next().is_some_and(|c| return c.is_ascii_uppercase());
        if is_interface || base_type.is_some() {
            interfaces.push(entry.to_string());
        } else {
            base_type = Some(entry.to_string());
        }
    }

    return (base_type, interfaces);
}

/// Split on commas that are not nested inside `<>`, `()` or `[]`.
fn split_top_level(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0_usize;

    for (offset, ch) in raw.char_indices() {
        match ch {
            '<' | '(' | '[' => depth = depth.saturating_add(1),
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(raw.get(start..offset).unwrap_or(""));
                start = offset.saturating_add(1);
            },
            _ => {},
        }
    }
    parts.push(raw.get(start..).unwrap_or(""));
    return parts;
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER_SERVICE: &str = "\
namespace Foo.Bar;
public class OrderService
{
    public async Task<Order> CreateOrder(int customerId)
    {
        _repository.Save(order);
        return order;
    }
}
";

    fn extractor() -> Extractor {
        Extractor::new().unwrap()
    }

    #[test]
    fn extracts_order_service_scenario() {
        let record = extractor().extract(ORDER_SERVICE, "Services/OrderService.cs");

        assert_eq!(record.namespace.as_deref(), Some("Foo.Bar"));
        assert_eq!(record.types.len(), 1);
        let ty = &record.types[0];
        assert_eq!(ty.name, "OrderService");
        assert_eq!(ty.kind, TypeKind::Class);
        assert_eq!(ty.access_level, AccessLevel::Public);
        assert_eq!(ty.line_number, 2);

        assert_eq!(ty.members.methods.len(), 1);
        let method = &ty.members.methods[0];
        assert_eq!(method.name, "CreateOrder");
        assert!(method.is_async);
        assert_eq!(method.return_type, "Task<Order>");
        assert_eq!(method.line_number, 4);
        assert_eq!(
            method.parameters,
            vec![Parameter { name: "customerId".to_string(), type_name: "int".to_string() }]
        );
        assert_eq!(
            method.call_edges,
            vec![CallEdge {
                chain_key: Some("_repository.Save".to_string()),
                kind: CallKind::Instance,
                receiver: Some("_repository".to_string()),
                target: "Save".to_string(),
            }]
        );
        assert_eq!(method.signature_text, "Task<Order> CreateOrder(int customerId)");
    }

    #[test]
    fn never_panics_on_degenerate_input() {
        let ex = extractor();
        let bytes = [0xff, 0x7b, 0x00, 0x7d, 0x7d, 0xfe, 0x7b];
        let garbage = String::from_utf8_lossy(&bytes).to_string();
        for text in ["", "{", "}}}{{{", "public class", "public class A {", garbage.as_str()] {
            let record = ex.extract(text, "x.cs");
            assert!(record.namespace.is_none(), "unexpected namespace in {text:?}");
        }
    }

    #[test]
    fn brace_body_is_balanced() {
        let text = "x { a { b } { c { d } } e } tail";
        let open = text.find('{').unwrap();
        let range = brace_body(text, open).unwrap();
        let body = &text[range];
        assert_eq!(body.matches('{').count(), body.matches('}').count());
        assert_eq!(body, " a { b } { c { d } } e ");
    }

    #[test]
    fn brace_body_rejects_unbalanced_and_non_brace_start() {
        assert_eq!(brace_body("{ { }", 0), None);
        assert_eq!(brace_body("abc", 0), None);
        assert_eq!(brace_body("{", 5), None);
    }

    #[test]
    fn unbalanced_type_keeps_extracting_later_types() {
        let text = "\
public class Broken {
    public string Name { get; set; }
public class Inner {
    public int Count { get; set; }
}
";
        let record = extractor().extract(text, "x.cs");
        let names: Vec<&str> = record.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Broken", "Inner"]);
        assert!(record.types[0].members.properties.is_empty());
        assert_eq!(record.types[1].members.properties.len(), 1);
        assert_eq!(record.types[1].members.properties[0].name, "Count");
    }

    #[test]
    fn sibling_members_do_not_leak() {
        let text = "\
public class First {
    public string Alpha { get; set; }
    public void Run() { Go(); }
}
public class Second {
    public string Beta { get; set; }
}
";
        let record = extractor().extract(text, "x.cs");
        assert_eq!(record.types.len(), 2);
        let first: Vec<&str> =
            record.types[0].members.properties.iter().map(|p| p.name.as_str()).collect();
        let second: Vec<&str> =
            record.types[1].members.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(first, vec!["Alpha"]);
        assert_eq!(second, vec!["Beta"]);
        assert!(record.types[1].members.methods.is_empty());
    }

    #[test]
    fn nested_type_is_not_a_property() {
        let text = "\
public class Outer {
    public partial class Inner { }
    public static class Helpers { }
    public string Name { get; set; }
}";
        let record = extractor().extract(text, "x.cs");
        let outer = record.types.iter().find(|t| t.name == "Outer").unwrap();
        let names: Vec<&str> = outer.members.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Name"]);
    }

    #[test]
    fn property_filters_lowercase_and_duplicates() {
        let text = "\
public class Order
{
    private readonly IOrderRepository orders;
    public string Status { get; private set; }
    public int Total { get; set; }
    public string Status { get; set; }
}
";
        let record = extractor().extract(text, "x.cs");
        let props = &record.types[0].members.properties;
        let names: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Status", "Total"]);
        assert_eq!(props[0].declared_type, "string");
        assert_eq!(props[0].line_number, 4);
        assert_eq!(props[1].line_number, 5);
    }

    #[test]
    fn base_list_splits_by_interface_convention() {
        let (base, interfaces) = split_base_list("Entity, IAggregateRoot, IHandler<A, B>");
        assert_eq!(base.as_deref(), Some("Entity"));
        assert_eq!(interfaces, vec!["IAggregateRoot", "IHandler<A, B>"]);

        let (base, interfaces) = split_base_list("IRequest<bool>, Base, Other");
        assert_eq!(base.as_deref(), Some("Base"));
        assert_eq!(interfaces, vec!["IRequest<bool>", "Other"]);

        let (base, interfaces) = split_base_list("");
        assert!(base.is_none());
        assert!(interfaces.is_empty());
    }

    #[test]
    fn declaration_records_bases_and_modifiers() {
        let text = "\
public sealed partial class Handler : IRequestHandler<CreateOrder, bool>, BaseHandler
{
}
";
        let record = extractor().extract(text, "x.cs");
        let ty = &record.types[0];
        assert_eq!(ty.modifiers, vec!["sealed", "partial"]);
        assert_eq!(ty.base_type.as_deref(), Some("BaseHandler"));
        assert_eq!(ty.implemented_interfaces, vec!["IRequestHandler<CreateOrder, bool>"]);
    }

    #[test]
    fn parameters_drop_defaults_and_keep_generics() {
        let params =
            parse_parameters("Dictionary<string, int> map, int retries = 3, CancellationToken");
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].type_name, "Dictionary<string, int>");
        assert_eq!(params[0].name, "map");
        assert_eq!(params[1].type_name, "int");
        assert_eq!(params[1].name, "retries");
        assert_eq!(params[2].type_name, "CancellationToken");
        assert_eq!(params[2].name, "");
        assert!(parse_parameters("").is_empty());
    }

    #[test]
    fn call_edges_follow_precedence_and_dedup() {
        let text = "\
public class Handler
{
    public void Handle()
    {
        _context.Orders.Add(order);
        _context.Orders.Add(other);
        list.Add(order);
        _logger.LogInformation(\"x\");
        _logger.LogInformation(\"y\");
        helper.compute();
        var o = new Order(1);
        var p = new Order(2);
    }
}
";
        let record = extractor().extract(text, "x.cs");
        let edges = &record.types[0].members.methods[0].call_edges;
        let keys: Vec<(CallKind, &str)> =
            edges.iter().map(|e| (e.kind, e.target.as_str())).collect();
        assert_eq!(
            keys,
            vec![
                (CallKind::Chain, "Add"),
                (CallKind::Instance, "LogInformation"),
                (CallKind::Constructor, "Order"),
            ]
        );
        assert_eq!(edges[0].chain_key.as_deref(), Some("Orders.Add"));
        assert_eq!(edges[0].receiver.as_deref(), Some("Orders"));
    }

    #[test]
    fn interface_members_do_not_steal_following_bodies() {
        let text = "\
public interface IOrderRepository
{
    public Task<Order> GetAsync(int id);
    public int Count => 0;
}
public class Repo
{
    public void Save() { _db.SaveChanges(); }
}
";
        let record = extractor().extract(text, "x.cs");
        let methods = &record.types[0].members.methods;
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].body_text, "");
        assert!(methods[0].call_edges.is_empty());
        let repo_method = &record.types[1].members.methods[0];
        assert_eq!(repo_method.call_edges[0].target, "SaveChanges");
    }

    #[test]
    fn member_lines_are_exact_for_both_brace_styles() {
        let text = "\
public class Allman
{

    public string Name { get; set; }
}
public class Egyptian {
    public string Name { get; set; }
}
";
        let record = extractor().extract(text, "x.cs");
        assert_eq!(record.types[0].members.properties[0].line_number, 4);
        assert_eq!(record.types[1].line_number, 6);
        assert_eq!(record.types[1].members.properties[0].line_number, 7);
    }
}
