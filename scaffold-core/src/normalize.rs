//! # Normalizer
//!
//! Brings every generated artifact into canonical form before it is handed back to
//! `protoc`:
//!
//! * all top level `use` items are flattened into single-path declarations, deduplicated,
//!   sorted and reinserted as one block at the top of the file;
//! * declarations whose binding is never mentioned in the rest of the file are dropped;
//! * the result is pretty-printed with `prettyplease`.
//!
//! Glob imports, `as _` imports and `pub use` re-exports are always kept. A `use` item
//! carrying attributes (e.g. `#[cfg(test)]`) is left exactly where it is.
//!
//! A name is considered used when it appears as an identifier anywhere in the file,
//! including macro invocations and attributes. A trait imported only for its methods
//! is therefore not "used" and must be imported as `use path::Trait as _;`.
use proc_macro2::{TokenStream, TokenTree};
use quote::ToTokens;
use std::collections::{BTreeSet, HashSet};
use syn::{File, Item, ItemUse, UseTree, Visibility};

const PATH_SEPARATOR: &str = "::";

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Generated source is not valid Rust")]
    Unparsable(#[from] syn::Error),
}

/// Parses, tidies the imports of and pretty-prints `source`.
///
/// # Returns
///
/// * `Ok(String)` - The canonical source. Normalizing it again yields the same text.
/// * `Err(NormalizeError)` - If `source` is not a valid Rust file.
pub fn normalize(source: &str) -> Result<String, NormalizeError> {
    let mut file = syn::parse_file(source)?;
    tidy_imports(&mut file)?;
    Ok(prettyplease::unparse(&file))
}

/// Pretty-prints `source` without touching its imports.
pub fn format_source(source: &str) -> Result<String, NormalizeError> {
    let file = syn::parse_file(source)?;
    Ok(prettyplease::unparse(&file))
}

/// Rewrites the top level `use` items of `file` into a single sorted block.
pub fn tidy_imports(file: &mut File) -> Result<(), NormalizeError> {
    let mut flattened = Vec::new();
    let mut rest = Vec::with_capacity(file.items.len());

    for item in std::mem::take(&mut file.items) {
        match item {
            Item::Use(item) if item.attrs.is_empty() => flatten_item(&item, &mut flattened),
            other => rest.push(other),
        }
    }
    file.items = rest;

    let used = used_identifiers(file.to_token_stream());

    let imports: BTreeSet<Import> = flattened
        .into_iter()
        .filter(|import| import.is_kept(&used))
        .map(|import| import.import)
        .collect();

    let block = imports
        .iter()
        .map(|import| syn::parse_str::<ItemUse>(&import.to_string()).map(Item::Use))
        .collect::<Result<Vec<_>, _>>()?;

    let rest = std::mem::replace(&mut file.items, block);
    file.items.extend(rest);

    Ok(())
}

/// A single-path `use` declaration. Ordered by path first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Import {
    path: String,
    visibility: String,
}

impl std::fmt::Display for Import {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.visibility.is_empty() {
            write!(f, "use {};", self.path)
        } else {
            write!(f, "{} use {};", self.visibility, self.path)
        }
    }
}

/// What a flattened import brings into scope.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    Name(String),
    /// `as _`
    Anonymous,
    Glob,
}

#[derive(Debug)]
struct FlatImport {
    import: Import,
    binding: Binding,
    public: bool,
}

impl FlatImport {
    fn is_kept(&self, used: &HashSet<String>) -> bool {
        if self.public {
            return true;
        }

        match &self.binding {
            Binding::Name(name) => used.contains(name),
            Binding::Anonymous | Binding::Glob => true,
        }
    }
}

fn flatten_item(item: &ItemUse, out: &mut Vec<FlatImport>) {
    let visibility = match &item.vis {
        Visibility::Inherited => String::new(),
        vis => vis.to_token_stream().to_string(),
    };
    let public = !matches!(item.vis, Visibility::Inherited);

    let mut leaves = Vec::new();
    flatten_tree(&item.tree, &[], &mut leaves);

    for (path, binding) in leaves {
        let path = match item.leading_colon {
            Some(_) => format!("{PATH_SEPARATOR}{path}"),
            None => path,
        };

        out.push(FlatImport {
            import: Import {
                path,
                visibility: visibility.clone(),
            },
            binding,
            public,
        });
    }
}

fn flatten_tree(tree: &UseTree, prefix: &[String], out: &mut Vec<(String, Binding)>) {
    match tree {
        UseTree::Path(path) => {
            let mut next = prefix.to_vec();
            next.push(path.ident.to_string());
            flatten_tree(&path.tree, &next, out);
        }
        UseTree::Name(name) if name.ident == "self" => {
            // `a::b::{self}` imports `a::b`
            let binding = prefix.last().cloned().unwrap_or_else(|| "self".to_string());
            out.push((joined(prefix, None), Binding::Name(binding)));
        }
        UseTree::Name(name) => {
            let name = name.ident.to_string();
            out.push((joined(prefix, Some(&name)), Binding::Name(name)));
        }
        UseTree::Rename(rename) => {
            let target = if rename.ident == "self" {
                joined(prefix, None)
            } else {
                joined(prefix, Some(&rename.ident.to_string()))
            };
            let alias = rename.rename.to_string();
            let binding = if alias == "_" {
                Binding::Anonymous
            } else {
                Binding::Name(alias.clone())
            };
            out.push((format!("{target} as {alias}"), binding));
        }
        UseTree::Glob(_) => out.push((joined(prefix, Some("*")), Binding::Glob)),
        UseTree::Group(group) => {
            for tree in &group.items {
                flatten_tree(tree, prefix, out);
            }
        }
    }
}

fn joined(prefix: &[String], last: Option<&str>) -> String {
    let mut segments: Vec<&str> = prefix.iter().map(String::as_str).collect();
    segments.extend(last);

    if segments.is_empty() {
        return "self".to_string();
    }

    segments.join(PATH_SEPARATOR)
}

fn used_identifiers(tokens: TokenStream) -> HashSet<String> {
    let mut used = HashSet::new();
    collect_identifiers(tokens, &mut used);
    used
}

fn collect_identifiers(tokens: TokenStream, used: &mut HashSet<String>) {
    for token in tokens {
        match token {
            TokenTree::Ident(ident) => {
                used.insert(ident.to_string());
            }
            TokenTree::Group(group) => collect_identifiers(group.stream(), used),
            TokenTree::Punct(_) | TokenTree::Literal(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn use_lines(source: &str) -> Vec<&str> {
        source
            .lines()
            .filter(|line| line.starts_with("use ") || line.starts_with("pub use "))
            .collect()
    }

    #[test]
    fn test_imports_are_flattened_sorted_and_deduplicated() {
        let source = r#"
            use tonic::{Request, Status};
            use crate::pb::catalog::v1;
            use tonic::Request;

            fn handle(_: Request<v1::Item>) -> Result<(), Status> {
                Ok(())
            }
        "#;

        let out = normalize(source).unwrap();

        assert_eq!(
            use_lines(&out),
            [
                "use crate::pb::catalog::v1;",
                "use tonic::Request;",
                "use tonic::Status;",
            ]
        );
    }

    #[test]
    fn test_unused_imports_are_removed() {
        let source = r#"
            use tonic::codegen::BoxStream;
            use tonic::{Response, Status, Streaming};

            fn reject() -> Status {
                Status::internal("boom")
            }
        "#;

        let out = normalize(source).unwrap();

        assert_eq!(use_lines(&out), ["use tonic::Status;"]);
    }

    #[test]
    fn test_imports_after_items_move_to_the_top() {
        let source = r#"
            //! Module `getitem` generated from `catalog.v1.Catalog.GetItem`.

            fn first() -> Item {
                Item::default()
            }

            use crate::pb::catalog::v1::Item;
        "#;

        let out = normalize(source).unwrap();
        let mut lines = out.lines().filter(|line| !line.trim().is_empty());

        assert_eq!(
            lines.next(),
            Some("//! Module `getitem` generated from `catalog.v1.Catalog.GetItem`.")
        );
        assert_eq!(lines.next(), Some("use crate::pb::catalog::v1::Item;"));
        assert_eq!(lines.next(), Some("fn first() -> Item {"));
    }

    #[test]
    fn test_renamed_imports_are_kept_by_their_alias() {
        let source = r#"
            use crate::pb::catalog::v1 as v11;
            use crate::pb::common::v1 as unused;

            fn page() -> v11::Page {
                todo!()
            }
        "#;

        let out = normalize(source).unwrap();

        assert_eq!(use_lines(&out), ["use crate::pb::catalog::v1 as v11;"]);
    }

    #[test]
    fn test_glob_anonymous_and_public_imports_are_always_kept() {
        let source = r#"
            use std::fmt::Write as _;
            use tonic::codegen::*;
            pub use crate::pb::catalog::v1::Item;
            use std::collections::HashMap;
        "#;

        let out = normalize(source).unwrap();

        assert_eq!(
            use_lines(&out),
            [
                "pub use crate::pb::catalog::v1::Item;",
                "use std::fmt::Write as _;",
                "use tonic::codegen::*;",
            ]
        );
    }

    #[test]
    fn test_identifiers_inside_macros_and_attributes_count_as_used() {
        let source = r#"
            use serde::Serialize;
            use crate::pb::catalog::v1::Item;

            #[derive(Serialize)]
            struct Listing {
                count: usize,
            }

            fn items() -> usize {
                vec![Item::default()].len()
            }
        "#;

        let out = normalize(source).unwrap();

        assert_eq!(
            use_lines(&out),
            ["use crate::pb::catalog::v1::Item;", "use serde::Serialize;"]
        );
    }

    #[test]
    fn test_self_in_group_imports_the_module() {
        let source = r#"
            use crate::pb::catalog::{self, v1};

            fn both(_: catalog::Marker, _: v1::Item) {}
        "#;

        let out = normalize(source).unwrap();

        assert_eq!(
            use_lines(&out),
            ["use crate::pb::catalog;", "use crate::pb::catalog::v1;"]
        );
    }

    #[test]
    fn test_attributed_imports_are_left_alone() {
        let source = r#"
            fn main() {}

            #[cfg(test)]
            use std::collections::HashMap;
        "#;

        let out = normalize(source).unwrap();

        assert!(out.contains("#[cfg(test)]\nuse std::collections::HashMap;"));
        assert!(out.find("fn main").unwrap() < out.find("#[cfg(test)]").unwrap());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let source = r#"
            //! Module `catalog` generated from `catalog.v1.Catalog`.
            use tonic::{Request, Response, Status};
            use crate::pb::catalog::v1;
            pub(crate) use crate::pb::common::v1 as common;

            pub async fn get(request: Request<v1::GetItemRequest>) -> Result<Response<v1::Item>, Status> {
                let _ = request; Err(Status::unimplemented("get"))
            }
        "#;

        let once = normalize(source).unwrap();
        let twice = normalize(&once).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_invalid_source_is_an_error() {
        let err = normalize("fn broken( {").unwrap_err();

        assert!(matches!(err, NormalizeError::Unparsable(_)));
    }

    #[test]
    fn test_format_source_keeps_unused_imports() {
        let out = format_source("use std::collections::HashMap;\nfn   main(){}").unwrap();
        let lines: Vec<_> = out.lines().filter(|line| !line.is_empty()).collect();

        assert_eq!(lines, ["use std::collections::HashMap;", "fn main() {}"]);
    }
}
