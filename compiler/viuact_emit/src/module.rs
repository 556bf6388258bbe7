//! Read-only view of everything a compilation unit can refer to.
//!
//! A [`ModuleView`] is built once per module, before any function is
//! compiled, from the module's declarations and the views of the modules it
//! imports. The emitter only ever reads it, so one view is shared by every
//! function compilation, including ones running on other threads.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use viuact_ir::{Item, Name, Param, ParsedType, SourceModule, Span, StringInterner};
use viuact_types::{FnType, Primitives, Type, TypeVar};

use crate::EmitError;

/// Declared signature of one function overload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FnSignature {
    pub name: Name,
    /// Fully qualified name without the arity suffix.
    pub qualified: String,
    pub params: Vec<Param>,
    /// Declared type; its templates are the signature's quantified variables.
    pub ty: FnType,
    /// Whether the module defines a body for this signature.
    pub defined: bool,
}

impl FnSignature {
    pub fn arity(&self) -> usize {
        self.ty.params.len()
    }

    pub fn symbol(&self) -> String {
        format!("{}/{}", self.qualified, self.arity())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumField {
    pub name: Name,
    /// Runtime discriminant, in declaration order.
    pub index: u32,
    pub payload: Option<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDef {
    pub name: Name,
    pub templates: Vec<TypeVar>,
    pub fields: Vec<EnumField>,
}

impl EnumDef {
    pub fn field(&self, name: Name) -> Option<&EnumField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordDef {
    pub name: Name,
    pub fields: Vec<(Name, Type)>,
}

impl RecordDef {
    pub fn field(&self, name: Name) -> Option<&Type> {
        self.fields
            .iter()
            .find_map(|(field, ty)| (*field == name).then_some(ty))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionDef {
    pub tag: Name,
    pub value: Option<Type>,
}

/// Supplies the views of imported modules.
///
/// Loading interfaces from disk is the caller's business; the emitter only
/// asks for a module by path.
pub trait InterfaceSource {
    fn interface(&self, path: &[Name]) -> Option<Arc<ModuleView>>;
}

/// Interface source for modules that import nothing.
pub struct NoInterfaces;

impl InterfaceSource for NoInterfaces {
    fn interface(&self, _path: &[Name]) -> Option<Arc<ModuleView>> {
        None
    }
}

/// Declarations visible to one compilation unit.
#[derive(Debug, Default)]
pub struct ModuleView {
    name: String,
    /// Prefix of qualified function names; `None` for the executable module,
    /// whose functions are referred to by bare name.
    prefix: Option<String>,
    functions: FxHashMap<Name, SmallVec<[FnSignature; 1]>>,
    enums: FxHashMap<Name, EnumDef>,
    records: FxHashMap<Name, RecordDef>,
    exceptions: FxHashMap<Name, ExceptionDef>,
    imports: FxHashMap<Vec<Name>, Arc<ModuleView>>,
}

impl ModuleView {
    /// Populate a view from a module's declarations.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %module.name))]
    pub fn build(
        module: &SourceModule,
        interner: &StringInterner,
        executable: bool,
        source: &dyn InterfaceSource,
    ) -> Result<ModuleView, EmitError> {
        let mut view = ModuleView {
            name: module.name.clone(),
            prefix: (!executable).then(|| module.name.clone()),
            ..ModuleView::default()
        };
        let prims = Primitives::new(interner);
        let path_text = |path: &[Name]| {
            path.iter()
                .map(|seg| interner.lookup(*seg))
                .collect::<Vec<_>>()
                .join("::")
        };

        // Imports and type declarations first: signatures refer to them.
        for item in &module.items {
            match item {
                Item::Import(import) => {
                    let imported = source.interface(&import.path).ok_or_else(|| {
                        EmitError::UnknownModule {
                            path: path_text(&import.path),
                            span: import.span,
                        }
                    })?;
                    view.imports.insert(import.path.clone(), imported);
                }
                Item::Enum(decl) => {
                    let def = EnumDef {
                        name: decl.name,
                        templates: decl.templates.iter().copied().map(TypeVar::declared).collect(),
                        fields: decl
                            .fields
                            .iter()
                            .zip(0u32..)
                            .map(|(field, index)| EnumField {
                                name: field.name,
                                index,
                                payload: field.payload.as_ref().map(Type::from_parsed),
                            })
                            .collect(),
                    };
                    view.enums.insert(decl.name, def);
                }
                Item::Record(decl) => {
                    let def = RecordDef {
                        name: decl.name,
                        fields: decl
                            .fields
                            .iter()
                            .map(|(name, ty)| (*name, Type::from_parsed(ty)))
                            .collect(),
                    };
                    view.records.insert(decl.name, def);
                }
                Item::Exception(decl) => {
                    let def = ExceptionDef {
                        tag: decl.tag,
                        value: decl.value.as_ref().map(Type::from_parsed),
                    };
                    view.exceptions.insert(decl.tag, def);
                }
                Item::Fn(_) | Item::Val(_) => {}
            }
        }

        let checker = TypeChecker {
            view: &view,
            prims: &prims,
            interner,
        };
        for item in &module.items {
            match item {
                Item::Enum(decl) => {
                    for field in &decl.fields {
                        if let Some(payload) = &field.payload {
                            checker.check(payload, Some(decl.templates.as_slice()), decl.span)?;
                        }
                    }
                }
                Item::Record(decl) => {
                    for (_, ty) in &decl.fields {
                        checker.check(ty, Some(&[][..]), decl.span)?;
                    }
                }
                Item::Exception(decl) => {
                    if let Some(ty) = &decl.value {
                        checker.check(ty, Some(&[][..]), decl.span)?;
                    }
                }
                Item::Val(spec) => {
                    for ty in spec.params.iter().chain(std::iter::once(&spec.ret)) {
                        checker.check(ty, None, spec.span)?;
                    }
                }
                Item::Fn(_) | Item::Import(_) => {}
            }
        }

        for item in &module.items {
            let Item::Val(spec) = item else { continue };
            let params: Vec<Type> = spec.params.iter().map(Type::from_parsed).collect();
            let ret = Type::from_parsed(&spec.ret);
            let templates = Type::function(ret.clone(), params.clone(), Vec::new())
                .free_vars()
                .into_vec();
            let def = module
                .functions()
                .find(|def| def.name == spec.name && def.arity() == params.len());
            let signature = FnSignature {
                name: spec.name,
                qualified: view.qualify(interner.lookup(spec.name)),
                params: match def {
                    Some(def) => def.params.clone(),
                    None => vec![Param::Positional(Name::EMPTY); params.len()],
                },
                ty: FnType {
                    ret,
                    params,
                    templates,
                },
                defined: def.is_some(),
            };
            let overloads = view.functions.entry(spec.name).or_default();
            if overloads.iter().all(|o| o.arity() != signature.arity()) {
                overloads.push(signature);
            }
        }

        for def in module.functions() {
            let declared = view
                .functions(def.name)
                .iter()
                .any(|sig| sig.arity() == def.arity());
            if !declared {
                return Err(EmitError::MissingSignature {
                    function: format!("{}/{}", interner.lookup(def.name), def.arity()),
                    span: def.span,
                });
            }
        }

        tracing::debug!(
            functions = view.functions.len(),
            enums = view.enums.len(),
            records = view.records.len(),
            imports = view.imports.len(),
            "module view populated"
        );
        Ok(view)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified name of a function declared in this module.
    pub fn qualify(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}::{name}"),
            None => name.to_string(),
        }
    }

    /// Overloads declared under `name`, in declaration order.
    pub fn functions(&self, name: Name) -> &[FnSignature] {
        self.functions
            .get(&name)
            .map(SmallVec::as_slice)
            .unwrap_or_default()
    }

    /// Signature of the `name` overload taking `arity` parameters.
    pub fn signature(&self, name: Name, arity: usize) -> Option<&FnSignature> {
        self.functions(name).iter().find(|sig| sig.arity() == arity)
    }

    /// Every signature, sorted by qualified name and arity.
    pub fn signatures(&self) -> Vec<&FnSignature> {
        let mut all: Vec<&FnSignature> = self.functions.values().flatten().collect();
        all.sort_by(|a, b| {
            a.qualified
                .cmp(&b.qualified)
                .then(a.arity().cmp(&b.arity()))
        });
        all
    }

    /// The view a possibly empty module path refers to.
    pub fn module(&self, path: &[Name]) -> Option<&ModuleView> {
        if path.is_empty() {
            Some(self)
        } else {
            self.imports.get(path).map(Arc::as_ref)
        }
    }

    /// Enum declared here or in an imported module.
    pub fn find_enum(&self, name: Name) -> Option<&EnumDef> {
        self.enums
            .get(&name)
            .or_else(|| self.imports.values().find_map(|m| m.enums.get(&name)))
    }

    pub fn find_record(&self, name: Name) -> Option<&RecordDef> {
        self.records
            .get(&name)
            .or_else(|| self.imports.values().find_map(|m| m.records.get(&name)))
    }

    pub fn find_exception(&self, tag: Name) -> Option<&ExceptionDef> {
        self.exceptions
            .get(&tag)
            .or_else(|| self.imports.values().find_map(|m| m.exceptions.get(&tag)))
    }
}

/// Validates type expressions in declarations against known type names.
struct TypeChecker<'a> {
    view: &'a ModuleView,
    prims: &'a Primitives,
    interner: &'a StringInterner,
}

impl TypeChecker<'_> {
    /// `templates` lists the variables in scope; `None` accepts any.
    fn check(&self, ty: &ParsedType, templates: Option<&[Name]>, span: Span) -> Result<(), EmitError> {
        match ty {
            ParsedType::Void => Ok(()),
            ParsedType::Template(name) => match templates {
                Some(allowed) if !allowed.contains(name) => Err(EmitError::UnknownType {
                    name: self.interner.lookup(*name).to_string(),
                    span,
                }),
                _ => Ok(()),
            },
            ParsedType::Fn { ret, params } => {
                for param in params {
                    self.check(param, templates, span)?;
                }
                self.check(ret, templates, span)
            }
            ParsedType::Named { name, args } => {
                let expected = self.arity_of(*name).ok_or_else(|| EmitError::UnknownType {
                    name: self.interner.lookup(*name).to_string(),
                    span,
                })?;
                if expected != args.len() {
                    return Err(EmitError::TypeArity {
                        name: self.interner.lookup(*name).to_string(),
                        expected,
                        given: args.len(),
                        span,
                    });
                }
                for arg in args {
                    self.check(arg, templates, span)?;
                }
                Ok(())
            }
        }
    }

    fn arity_of(&self, name: Name) -> Option<usize> {
        if self.prims.is_builtin(name) {
            return Some(self.prims.arity(name));
        }
        if let Some(def) = self.view.find_enum(name) {
            return Some(def.templates.len());
        }
        self.view.find_record(name).map(|_| 0)
    }
}
