//! # Identifier Resolver
//!
//! Turns references to `prost`-generated types into Rust paths that are valid inside a
//! given generated artifact.
//!
//! Every artifact owns an [`ImportScope`]. Resolving a type through the scope returns the
//! expression to write in the template (`v1::GetItemRequest`) and records the `use`
//! declaration that makes the alias available. The scope over-declares on purpose: the
//! [`normalize`](crate::normalize) pass drops whatever the rendered body never mentions.
use std::collections::{HashMap, HashSet};
use std::fmt;

const PATH_SEPARATOR: &str = "::";

/// A `::` separated Rust module path, e.g. `crate::pb::catalog::v1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath {
    segments: Vec<String>,
}

impl ModulePath {
    /// Parses a path such as `crate::pb`. Empty segments are ignored.
    pub fn parse(path: &str) -> Self {
        let segments = path
            .split(PATH_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Self { segments }
    }

    /// Returns a new path with `segment` appended.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment, or an empty string for an empty path.
    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// A single segment path that is not a relative keyword names an external crate,
    /// which is in scope everywhere without a `use` declaration.
    pub fn is_extern_crate(&self) -> bool {
        match self.segments.as_slice() {
            [single] => !matches!(single.as_str(), "crate" | "self" | "super"),
            _ => false,
        }
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(PATH_SEPARATOR))
    }
}

/// A Rust type as `prost` generates it for a protobuf message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RustType {
    /// `google.protobuf.Empty` is mapped to `()`.
    Unit,
    /// A named type declared in `module`.
    Path { module: ModulePath, name: String },
}

/// The import bookkeeping of a single generated artifact.
#[derive(Debug, Clone)]
pub struct ImportScope {
    home: ModulePath,
    aliases: HashMap<ModulePath, String>,
    taken: HashSet<String>,
    declarations: Vec<String>,
}

impl ImportScope {
    /// Creates an empty scope for an artifact that lives in `home`.
    pub fn new(home: ModulePath) -> Self {
        Self {
            home,
            aliases: HashMap::new(),
            taken: HashSet::new(),
            declarations: Vec::new(),
        }
    }

    /// Resolves `ty` into an expression usable inside this artifact.
    ///
    /// Types declared in the artifact's own module are returned bare. Anything else is
    /// qualified by the alias of its module.
    pub fn resolve(&mut self, ty: &RustType) -> String {
        match ty {
            RustType::Unit => "()".to_string(),
            RustType::Path { module, name } if *module == self.home => name.clone(),
            RustType::Path { module, name } => {
                format!("{}{PATH_SEPARATOR}{name}", self.alias_for(module))
            }
        }
    }

    /// Returns the alias under which `module` is reachable, declaring it on first use.
    ///
    /// * the artifact's own module is `self`;
    /// * external crates are referred to by their crate name;
    /// * every other module is imported under its last segment, suffixed with `1`, `2`, ...
    ///   when a different module already claimed that name in this scope.
    pub fn alias_for(&mut self, module: &ModulePath) -> String {
        if *module == self.home {
            return "self".to_string();
        }

        if module.is_extern_crate() {
            return module.last().to_string();
        }

        if let Some(alias) = self.aliases.get(module) {
            return alias.clone();
        }

        let base = module.last().to_string();
        let mut alias = base.clone();
        let mut counter = 1;
        while self.taken.contains(&alias) || is_reserved_alias(&alias) {
            alias = format!("{base}{counter}");
            counter += 1;
        }

        let declaration = if alias == module.last() {
            format!("use {module};")
        } else {
            format!("use {module} as {alias};")
        };

        self.declarations.push(declaration);
        self.taken.insert(alias.clone());
        self.aliases.insert(module.clone(), alias.clone());
        alias
    }

    /// The `use` declarations recorded so far, in recording order.
    pub fn declarations(&self) -> &[String] {
        &self.declarations
    }
}

fn is_reserved_alias(alias: &str) -> bool {
    matches!(alias, "self" | "super" | "crate" | "Self")
}

/// Derives the module path of the sibling transport bindings of `module`.
///
/// The derived path is `module::{last}{suffix}`, so `crate::pb::catalog::v1` with the
/// suffix `_connect` becomes `crate::pb::catalog::v1::v1_connect`. Nothing is looked up:
/// the path is computed whether or not those bindings exist.
pub fn derive_alternate_transport_path(module: &ModulePath, suffix: &str) -> ModulePath {
    let last = module.last().trim_start_matches("r#");
    module.join(format!("{last}{suffix}"))
}
