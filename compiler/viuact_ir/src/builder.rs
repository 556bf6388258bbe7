//! Programmatic construction of source modules.
//!
//! The parser is an external collaborator; callers that synthesise code
//! (and the test suites of every downstream crate) build modules through
//! [`FormBuilder`] instead. Every form receives a distinct synthetic span so
//! diagnostics still point at one node.

use crate::{
    Argument, CallKind, Callee, CatchArm, EnumDecl, EnumFieldDecl, ExceptionDecl, FieldInit,
    FnDef, FormId, FormKind, Import, Item, Literal, MatchArm, Name, Operator, Param, ParsedType,
    RecordDecl, SourceModule, Span, StringInterner, ValSpec,
};

pub struct FormBuilder<'a> {
    interner: &'a StringInterner,
    module: SourceModule,
    cursor: u32,
}

impl<'a> FormBuilder<'a> {
    pub fn new(interner: &'a StringInterner, module_name: &str) -> Self {
        FormBuilder {
            interner,
            module: SourceModule::new(module_name),
            cursor: 0,
        }
    }

    pub fn interner(&self) -> &'a StringInterner {
        self.interner
    }

    #[inline]
    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    fn next_span(&mut self) -> Span {
        let start = self.cursor;
        self.cursor = self.cursor.saturating_add(1);
        Span::new(start, self.cursor)
    }

    fn alloc(&mut self, kind: FormKind) -> FormId {
        let span = self.next_span();
        self.module.arena.alloc(kind, span)
    }

    /// Split `A::B::c` into its module path and final segment.
    fn path(&self, s: &str) -> (Vec<Name>, Name) {
        let mut segments: Vec<Name> = s.split("::").map(|seg| self.name(seg)).collect();
        let last = segments.pop().unwrap_or(Name::EMPTY);
        (segments, last)
    }

    // ── Expressions ─────────────────────────────────────────────────

    pub fn string(&mut self, s: &str) -> FormId {
        let name = self.name(s);
        self.alloc(FormKind::Literal(Literal::String(name)))
    }

    pub fn int(&mut self, value: i64) -> FormId {
        self.alloc(FormKind::Literal(Literal::Integer(value)))
    }

    pub fn boolean(&mut self, value: bool) -> FormId {
        self.alloc(FormKind::Literal(Literal::Bool(value)))
    }

    pub fn var(&mut self, name: &str) -> FormId {
        let name = self.name(name);
        self.alloc(FormKind::NameRef(name))
    }

    pub fn let_(&mut self, name: &str, value: FormId) -> FormId {
        let name = self.name(name);
        self.alloc(FormKind::Let { name, value })
    }

    pub fn compound(&mut self, forms: Vec<FormId>) -> FormId {
        self.alloc(FormKind::Compound(forms))
    }

    /// Positional argument.
    pub fn arg(&self, value: FormId) -> Argument {
        Argument { label: None, value }
    }

    /// Argument bound to the labelled parameter `label`.
    pub fn labelled(&self, label: &str, value: FormId) -> Argument {
        Argument {
            label: Some(self.name(label)),
            value,
        }
    }

    /// Synchronous call with positional arguments. `callee` may be
    /// module-qualified (`Std::Io::print`).
    pub fn call(&mut self, callee: &str, args: Vec<FormId>) -> FormId {
        let args = args.into_iter().map(|value| self.arg(value)).collect();
        self.call_with(callee, args, CallKind::Synchronous)
    }

    pub fn call_kind(&mut self, callee: &str, args: Vec<FormId>, kind: CallKind) -> FormId {
        let args = args.into_iter().map(|value| self.arg(value)).collect();
        self.call_with(callee, args, kind)
    }

    pub fn call_with(&mut self, callee: &str, args: Vec<Argument>, kind: CallKind) -> FormId {
        let (module, name) = self.path(callee);
        let span = self.next_span();
        let callee = Callee { module, name, span };
        self.alloc(FormKind::Call { callee, args, kind })
    }

    pub fn op(&mut self, op: Operator, args: Vec<FormId>) -> FormId {
        self.alloc(FormKind::Operator { op, args })
    }

    pub fn if_(&mut self, guard: FormId, then_arm: FormId, else_arm: FormId) -> FormId {
        self.alloc(FormKind::If {
            guard,
            then_arm,
            else_arm,
        })
    }

    /// With-clause for `match_`. A tag of `_` makes the catch-all clause.
    pub fn arm(&mut self, tag: &str, binding: Option<&str>, body: FormId) -> MatchArm {
        let tag = (tag != "_").then(|| self.name(tag));
        MatchArm {
            tag,
            binding: binding.map(|b| self.name(b)),
            body,
            span: self.next_span(),
        }
    }

    pub fn match_(&mut self, guard: FormId, arms: Vec<MatchArm>) -> FormId {
        self.alloc(FormKind::Match { guard, arms })
    }

    pub fn throw(&mut self, tag: &str, value: Option<FormId>) -> FormId {
        let tag = self.name(tag);
        self.alloc(FormKind::Throw { tag, value })
    }

    pub fn catch(&mut self, tag: &str, binding: Option<&str>, body: FormId) -> CatchArm {
        CatchArm {
            tag: self.name(tag),
            binding: binding.map(|b| self.name(b)),
            body,
            span: self.next_span(),
        }
    }

    pub fn try_(&mut self, guard: FormId, arms: Vec<CatchArm>) -> FormId {
        self.alloc(FormKind::Try { guard, arms })
    }

    pub fn record(&mut self, record: &str, fields: Vec<(&str, FormId)>) -> FormId {
        let record = self.name(record);
        let fields = fields
            .into_iter()
            .map(|(name, value)| FieldInit {
                name: self.name(name),
                value,
                span: self.next_span(),
            })
            .collect();
        self.alloc(FormKind::RecordCtor { record, fields })
    }

    pub fn field(&mut self, base: FormId, field: &str) -> FormId {
        let field = self.name(field);
        self.alloc(FormKind::FieldAccess { base, field })
    }

    /// Enum constructor from a `[Module::]Enum::Field` path.
    pub fn enum_ctor(&mut self, path: &str, value: Option<FormId>) -> FormId {
        let (mut module, field) = self.path(path);
        let enum_name = module.pop().unwrap_or(Name::EMPTY);
        self.alloc(FormKind::EnumCtor {
            module,
            enum_name,
            field,
            value,
        })
    }

    pub fn inhibit(&mut self, inner: FormId) -> FormId {
        self.alloc(FormKind::InhibitDeref(inner))
    }

    pub fn vector(&mut self, elements: Vec<FormId>) -> FormId {
        self.alloc(FormKind::Vector(elements))
    }

    /// Parameter list; names starting with `~` are labelled.
    fn params(&self, params: &[&str]) -> Vec<Param> {
        params
            .iter()
            .map(|p| match p.strip_prefix('~') {
                Some(label) => Param::Labelled(self.name(label)),
                None => Param::Positional(self.name(p)),
            })
            .collect()
    }

    fn fn_def(&mut self, name: &str, params: &[&str], body: FormId) -> FnDef {
        FnDef {
            name: self.name(name),
            params: self.params(params),
            body,
            span: self.next_span(),
        }
    }

    /// Function defined inside another function's body.
    pub fn nested_fn(&mut self, name: &str, params: &[&str], body: FormId) -> FormId {
        let def = self.fn_def(name, params, body);
        self.alloc(FormKind::Function(Box::new(def)))
    }

    // ── Types ───────────────────────────────────────────────────────

    /// `'a` is a template, `void` is void, anything else a nominal type.
    pub fn ty(&self, s: &str) -> ParsedType {
        if s == "void" {
            ParsedType::Void
        } else if s.starts_with('\'') {
            ParsedType::Template(self.name(s))
        } else {
            ParsedType::named(self.name(s))
        }
    }

    pub fn ty_app(&self, name: &str, args: Vec<ParsedType>) -> ParsedType {
        ParsedType::Named {
            name: self.name(name),
            args,
        }
    }

    pub fn fn_ty(&self, params: Vec<ParsedType>, ret: ParsedType) -> ParsedType {
        ParsedType::Fn {
            ret: Box::new(ret),
            params,
        }
    }

    // ── Items ───────────────────────────────────────────────────────

    pub fn function(&mut self, name: &str, params: &[&str], body: FormId) {
        let def = self.fn_def(name, params, body);
        self.module.items.push(Item::Fn(def));
    }

    pub fn val(&mut self, name: &str, templates: &[&str], params: Vec<ParsedType>, ret: ParsedType) {
        let spec = ValSpec {
            name: self.name(name),
            templates: templates.iter().map(|t| self.name(t)).collect(),
            params,
            ret,
            span: self.next_span(),
        };
        self.module.items.push(Item::Val(spec));
    }

    pub fn enum_decl(&mut self, name: &str, templates: &[&str], fields: Vec<(&str, Option<ParsedType>)>) {
        let decl = EnumDecl {
            name: self.name(name),
            templates: templates.iter().map(|t| self.name(t)).collect(),
            fields: fields
                .into_iter()
                .map(|(field, payload)| EnumFieldDecl {
                    name: self.name(field),
                    payload,
                })
                .collect(),
            span: self.next_span(),
        };
        self.module.items.push(Item::Enum(decl));
    }

    pub fn record_decl(&mut self, name: &str, fields: Vec<(&str, ParsedType)>) {
        let decl = RecordDecl {
            name: self.name(name),
            fields: fields
                .into_iter()
                .map(|(field, ty)| (self.name(field), ty))
                .collect(),
            span: self.next_span(),
        };
        self.module.items.push(Item::Record(decl));
    }

    pub fn exception(&mut self, tag: &str, value: Option<ParsedType>) {
        let decl = ExceptionDecl {
            tag: self.name(tag),
            value,
            span: self.next_span(),
        };
        self.module.items.push(Item::Exception(decl));
    }

    pub fn import(&mut self, path: &str) {
        let path = path.split("::").map(|seg| self.name(seg)).collect();
        let span = self.next_span();
        self.module.items.push(Item::Import(Import { path, span }));
    }

    pub fn finish(self) -> SourceModule {
        self.module
    }
}
