//! # Renderer
//!
//! Executes the resolved templates against [`Method`] and [`Service`] records using
//! `tera`. Every template is parsed up front, so a broken override fails the run before
//! any artifact exists. Referencing a field the record does not have is a render error,
//! never an empty string.
use crate::config::TemplateConfig;
use crate::model::{Method, Service};
use crate::template::{self, TemplateError, TemplateRole, TemplateSource};
use serde::Serialize;
use tera::ast::{Expr, ExprVal, Node};
use tera::{Context, Tera, Value};

/// Variables every template may use without the record providing them.
const BUILTIN_VARIABLES: [&str; 2] = ["loop", "__tera_context"];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to render '{subject}' with the {role} template")]
    Render {
        role: TemplateRole,
        subject: String,
        #[source]
        source: tera::Error,
    },

    #[error("The {0} template has not been loaded")]
    MissingTemplate(TemplateRole),
}

/// The parsed templates of every role.
#[derive(Debug)]
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Resolves and parses the templates of every role.
    pub fn load(config: &TemplateConfig) -> Result<Self, TemplateError> {
        Self::new(template::resolve_all(config)?)
    }

    /// Parses the given template sources.
    pub fn new(sources: impl IntoIterator<Item = TemplateSource>) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        // Generated sources are not markup.
        tera.autoescape_on(vec![]);

        for source in sources {
            tera.add_raw_template(source.role.file_name(), &source.text)
                .map_err(|err| TemplateError::Parse {
                    role: source.role,
                    origin: source.origin.clone(),
                    source: err,
                })?;
        }

        Ok(Self { tera })
    }

    pub fn render_method(&self, method: &Method) -> Result<String, RenderError> {
        self.render(
            TemplateRole::for_direction(method.streaming),
            &method.full_name,
            method,
        )
    }

    pub fn render_service(&self, service: &Service) -> Result<String, RenderError> {
        self.render(TemplateRole::Service, &service.full_name, service)
    }

    fn render<T: Serialize>(
        &self,
        role: TemplateRole,
        subject: &str,
        record: &T,
    ) -> Result<String, RenderError> {
        let template_name = role.file_name();
        if !self.tera.get_template_names().any(|name| name == template_name) {
            return Err(RenderError::MissingTemplate(role));
        }

        let render_error = |source| RenderError::Render {
            role,
            subject: subject.to_string(),
            source,
        };

        let context = Context::from_serialize(record).map_err(render_error)?;
        let template = self.tera.get_template(template_name).map_err(render_error)?;
        check_variables(&template.ast, &context, &mut Vec::new()).map_err(render_error)?;

        self.tera.render(template_name, &context).map_err(render_error)
    }
}

/// Fails on the first variable that is neither in `context` nor bound by the template.
///
/// `tera` only rejects undefined variables when printing them: a condition, a loop
/// container or a `set` value naming a missing field silently evaluates to nothing.
/// Lookups guarded by `is defined` or the `default` filter are allowed.
fn check_variables(
    nodes: &[Node],
    context: &Context,
    locals: &mut Vec<String>,
) -> tera::Result<()> {
    for node in nodes {
        match node {
            Node::VariableBlock(_, expr) => check_expr(expr, context, locals)?,
            Node::Set(_, set) => {
                check_expr(&set.value, context, locals)?;
                locals.push(set.key.clone());
            }
            Node::If(branches, _) => {
                for (_, condition, body) in &branches.conditions {
                    check_expr(condition, context, locals)?;

                    let guard = defined_guard(condition);
                    let mut scope = locals.clone();
                    scope.extend(guard.clone());
                    check_variables(body, context, &mut scope)?;

                    // `set` inside a branch binds in the enclosing frame.
                    let bound = scope.split_off(locals.len() + usize::from(guard.is_some()));
                    locals.extend(bound);
                }
                if let Some((_, body)) = &branches.otherwise {
                    check_variables(body, context, locals)?;
                }
            }
            Node::Forloop(_, forloop, _) => {
                check_expr(&forloop.container, context, locals)?;

                let mut scope = locals.clone();
                scope.extend(forloop.key.iter().cloned());
                scope.push(forloop.value.clone());
                check_variables(&forloop.body, context, &mut scope)?;

                if let Some(body) = &forloop.empty_body {
                    check_variables(body, context, locals)?;
                }
            }
            Node::FilterSection(_, section, _) => {
                check_variables(&section.body, context, locals)?
            }
            Node::Block(_, block, _) => check_variables(&block.body, context, locals)?,
            _ => {}
        }
    }

    Ok(())
}

fn check_expr(expr: &Expr, context: &Context, locals: &[String]) -> tera::Result<()> {
    if expr.has_default_filter() {
        return Ok(());
    }

    for filter in &expr.filters {
        for arg in filter.args.values() {
            check_expr(arg, context, locals)?;
        }
    }

    check_value(&expr.val, context, locals)
}

fn check_all<'a>(
    exprs: impl IntoIterator<Item = &'a Expr>,
    context: &Context,
    locals: &[String],
) -> tera::Result<()> {
    exprs
        .into_iter()
        .try_for_each(|expr| check_expr(expr, context, locals))
}

fn check_value(value: &ExprVal, context: &Context, locals: &[String]) -> tera::Result<()> {
    match value {
        ExprVal::Ident(ident) => check_ident(ident, context, locals),
        ExprVal::Math(math) => check_all([&*math.lhs, &*math.rhs], context, locals),
        ExprVal::Logic(logic) => check_all([&*logic.lhs, &*logic.rhs], context, locals),
        ExprVal::In(contains) => check_all([&*contains.lhs, &*contains.rhs], context, locals),
        ExprVal::Test(test) => {
            if !is_definition_test(&test.name) {
                check_ident(&test.ident, context, locals)?;
            }
            check_all(&test.args, context, locals)
        }
        ExprVal::FunctionCall(call) => check_all(call.args.values(), context, locals),
        ExprVal::MacroCall(call) => check_all(call.args.values(), context, locals),
        ExprVal::Array(items) => check_all(items, context, locals),
        ExprVal::StringConcat(concat) => concat
            .values
            .iter()
            .try_for_each(|value| check_value(value, context, locals)),
        ExprVal::String(_) | ExprVal::Int(_) | ExprVal::Float(_) | ExprVal::Bool(_) => Ok(()),
    }
}

fn is_definition_test(name: &str) -> bool {
    matches!(name, "defined" | "undefined")
}

/// The variable `{% if x is defined %}` makes available to its body.
fn defined_guard(condition: &Expr) -> Option<String> {
    match &condition.val {
        ExprVal::Test(test) if test.name == "defined" && !test.negated && !condition.negated => {
            Some(root_of(&test.ident).to_string())
        }
        _ => None,
    }
}

/// `methods` in `methods.0.name` or `methods[0]`.
fn root_of(ident: &str) -> &str {
    ident.split(['.', '[']).next().unwrap_or(ident)
}

/// Checks the root of `ident`, and its whole dotted path when the root comes from the
/// record.
fn check_ident(ident: &str, context: &Context, locals: &[String]) -> tera::Result<()> {
    let root = root_of(ident);
    if BUILTIN_VARIABLES.contains(&root) || locals.iter().any(|local| local == root) {
        return Ok(());
    }

    let found = match context.get(root) {
        // Subscripts are resolved by tera itself.
        Some(_) if ident.contains('[') => true,
        Some(value) => ident
            .split('.')
            .skip(1)
            .try_fold(value, |value, segment| match value {
                Value::Object(fields) => fields.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
            .is_some(),
        None => false,
    };

    if found {
        Ok(())
    } else {
        Err(tera::Error::msg(format!(
            "Variable `{ident}` not found in context"
        )))
    }
}
