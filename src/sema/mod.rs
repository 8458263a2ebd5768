// Purpose: Resolve identifier occurrences and expression types across one compilation unit.
// Inputs/Outputs: Consumes parsed files and produces Defs/Uses/type maps keyed by ExprId.
// Invariants: Resolution never fails; unresolved names degrade to absent map entries.
// Gotchas: Must run before any rewriting pass so occurrence ids still match the parse.

pub mod types;

use std::collections::{HashMap, HashSet};

use strsim::levenshtein;

use crate::frontend::ast::*;
use crate::frontend::diagnostic::Diagnostic;

use self::types::{type_from_ast, Type, TypeDef, TypeDefs, PREDECLARED_TYPES};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Package,
    Type,
    Const,
    Func,
    Var,
    Field,
}

/// Export classification for one imported package, supplied by the
/// driving build tool when dependency information is available.
#[derive(Clone, Debug, Default)]
pub struct PackageExports {
    pub entities: HashMap<String, Entity>,
}

pub trait PackageImporter {
    fn exports(&self, path: &str) -> Option<PackageExports>;
}

/// Importer that knows nothing; every package-qualified selector stays
/// unresolved and the rewriter treats it conservatively.
pub struct NullImporter;

impl PackageImporter for NullImporter {
    fn exports(&self, _path: &str) -> Option<PackageExports> {
        None
    }
}

pub struct TypeInfo {
    pub defs: HashSet<ExprId>,
    pub uses: HashMap<ExprId, Entity>,
    pub expr_types: HashMap<ExprId, Type>,
    pub type_defs: TypeDefs,
    pub notes: Vec<Diagnostic>,
}

impl TypeInfo {
    pub fn entity_of(&self, id: ExprId) -> Option<Entity> {
        self.uses.get(&id).copied()
    }

    pub fn defines(&self, id: ExprId) -> bool {
        self.defs.contains(&id)
    }

    /// True when the expression's type is resolved and is definitely
    /// not the map kind. Absent type data answers false, which makes
    /// element instrumentation degrade to skipping.
    pub fn is_known_non_map(&self, id: ExprId) -> bool {
        match self.expr_types.get(&id) {
            Some(ty) => self.type_defs.is_known_non_map(ty),
            None => false,
        }
    }
}

pub fn resolve(files: &[FileAst], importer: &dyn PackageImporter) -> TypeInfo {
    let mut r = Resolver {
        importer,
        scopes: Vec::new(),
        package_paths: HashMap::new(),
        methods: HashMap::new(),
        type_defs: TypeDefs::default(),
        defs: HashSet::new(),
        uses: HashMap::new(),
        expr_types: HashMap::new(),
        notes: Vec::new(),
        noted: HashSet::new(),
    };
    r.run(files);
    TypeInfo {
        defs: r.defs,
        uses: r.uses,
        expr_types: r.expr_types,
        type_defs: r.type_defs,
        notes: r.notes,
    }
}

struct Binding {
    entity: Entity,
    ty: Type,
}

struct Resolver<'a> {
    importer: &'a dyn PackageImporter,
    scopes: Vec<HashMap<String, Binding>>,
    // File-scoped: local package name to import path.
    package_paths: HashMap<String, String>,
    // Receiver base type name to method name to signature.
    methods: HashMap<String, HashMap<String, Type>>,
    type_defs: TypeDefs,
    defs: HashSet<ExprId>,
    uses: HashMap<ExprId, Entity>,
    expr_types: HashMap<ExprId, Type>,
    notes: Vec<Diagnostic>,
    noted: HashSet<String>,
}

impl<'a> Resolver<'a> {
    fn run(&mut self, files: &[FileAst]) {
        // Universe scope: predeclared type names. Predeclared value
        // names (true, nil, len, ...) are matched by name in the
        // rewriter, mirroring how the hook emitters filter them.
        let mut universe = HashMap::new();
        for name in PREDECLARED_TYPES {
            universe.insert(
                (*name).to_string(),
                Binding {
                    entity: Entity::Type,
                    ty: Type::Named((*name).to_string()),
                },
            );
        }
        self.scopes.push(universe);

        // Package scope: every top-level name from every file, so
        // cross-file references resolve before any body is walked.
        self.scopes.push(HashMap::new());
        for file in files {
            for decl in &file.decls {
                self.declare_top_level(decl);
            }
        }

        for file in files {
            self.scopes.push(HashMap::new());
            self.package_paths.clear();
            for spec in &file.imports {
                let local = match &spec.alias {
                    Some(alias) if alias == "_" || alias == "." => continue,
                    Some(alias) => alias.clone(),
                    None => spec
                        .path
                        .rsplit('/')
                        .next()
                        .unwrap_or(&spec.path)
                        .to_string(),
                };
                self.package_paths.insert(local.clone(), spec.path.clone());
                self.bind(&local, Entity::Package, Type::Unknown);
            }
            for decl in &file.decls {
                match decl {
                    Decl::Func(f) => self.resolve_func(f),
                    Decl::Var(d) => self.resolve_top_values(&d.specs),
                    Decl::Const(d) => self.resolve_top_values(&d.specs),
                    Decl::Type(_) => {}
                }
            }
            self.scopes.pop();
        }
    }

    fn declare_top_level(&mut self, decl: &Decl) {
        match decl {
            Decl::Type(d) => {
                self.type_defs.insert(
                    d.name.clone(),
                    TypeDef {
                        underlying: type_from_ast(&d.ty),
                        is_alias: d.is_alias,
                    },
                );
                self.bind(&d.name, Entity::Type, Type::Named(d.name.clone()));
            }
            Decl::Func(f) => {
                let sig = func_type(&f.params, &f.results);
                match &f.recv {
                    Some(recv) => {
                        if let Some(base) = recv_base_name(&recv.ty) {
                            self.methods
                                .entry(base)
                                .or_default()
                                .insert(f.name.clone(), sig);
                        }
                    }
                    None => self.bind(&f.name, Entity::Func, sig),
                }
            }
            Decl::Var(d) => {
                for spec in &d.specs {
                    let ty = spec
                        .ty
                        .as_ref()
                        .map(type_from_ast)
                        .unwrap_or(Type::Unknown);
                    for name in &spec.names {
                        self.bind(name, Entity::Var, ty.clone());
                    }
                }
            }
            Decl::Const(d) => {
                for spec in &d.specs {
                    for name in &spec.names {
                        self.bind(name, Entity::Const, Type::Unknown);
                    }
                }
            }
        }
    }

    fn resolve_top_values(&mut self, specs: &[ValueSpec]) {
        for spec in specs {
            let value_tys: Vec<Type> = spec
                .values
                .iter()
                .map(|v| self.resolve_expr(v))
                .collect();
            if spec.ty.is_none() && spec.names.len() == value_tys.len() {
                // Upgrade package-scope bindings that were declared
                // without an explicit type.
                for (name, ty) in spec.names.iter().zip(value_tys) {
                    if ty == Type::Unknown {
                        continue;
                    }
                    if let Some(binding) = self.scopes[1].get_mut(name) {
                        if binding.ty == Type::Unknown {
                            binding.ty = ty;
                        }
                    }
                }
            }
        }
    }

    fn bind(&mut self, name: &str, entity: Entity, ty: Type) {
        if name == "_" {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Binding { entity, ty });
        }
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn current_scope_has(&self, name: &str) -> bool {
        self.scopes
            .last()
            .map(|s| s.contains_key(name))
            .unwrap_or(false)
    }

    fn note_unresolved(&mut self, name: &str, span: &Span) {
        if !self.noted.insert(name.to_string()) {
            return;
        }
        let mut message = format!("unresolved name `{}` (left uninstrumented)", name);
        let visible = self.scopes.iter().flat_map(|s| s.keys().cloned());
        if let Some(hint) = closest_name(name, visible) {
            message.push_str(&format!("; did you mean `{}`?", hint));
        }
        self.notes
            .push(Diagnostic::new(message, Some(span.clone())));
    }

    fn resolve_func(&mut self, f: &FuncDecl) {
        let Some(body) = &f.body else {
            return;
        };
        self.scopes.push(HashMap::new());
        if let Some(recv) = &f.recv {
            if let Some(name) = &recv.name {
                self.bind(name, Entity::Var, type_from_ast(&recv.ty));
            }
        }
        self.bind_params(&f.params);
        self.bind_params(&f.results);
        self.resolve_stmts(&body.stmts);
        self.scopes.pop();
    }

    fn bind_params(&mut self, params: &[Param]) {
        for group in params {
            let ty = type_from_ast(&group.ty);
            for name in &group.names {
                self.bind(name, Entity::Var, ty.clone());
            }
        }
    }

    fn resolve_block(&mut self, block: &Block) {
        self.scopes.push(HashMap::new());
        self.resolve_stmts(&block.stmts);
        self.scopes.pop();
    }

    fn resolve_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(decl) => self.resolve_local_decl(decl),
            Stmt::Expr { expr, .. } => {
                self.resolve_expr(expr);
            }
            Stmt::Send { chan, value, .. } => {
                self.resolve_expr(chan);
                self.resolve_expr(value);
            }
            Stmt::IncDec { expr, .. } => {
                self.resolve_expr(expr);
            }
            Stmt::Assign { lhs, op, rhs, .. } => {
                let rhs_tys: Vec<Type> = rhs.iter().map(|e| self.resolve_expr(e)).collect();
                if *op == AssignOp::Define {
                    self.resolve_define(lhs, &rhs_tys);
                } else {
                    for l in lhs {
                        self.resolve_expr(l);
                    }
                }
            }
            Stmt::Go { call, .. } | Stmt::Defer { call, .. } => {
                self.resolve_expr(call);
            }
            Stmt::Return { results, .. } => {
                for r in results {
                    self.resolve_expr(r);
                }
            }
            Stmt::Branch { .. } | Stmt::Empty { .. } => {}
            Stmt::Block(block) => self.resolve_block(block),
            Stmt::If(s) => {
                self.scopes.push(HashMap::new());
                if let Some(init) = &s.init {
                    self.resolve_stmt(init);
                }
                self.resolve_expr(&s.cond);
                self.resolve_block(&s.then);
                if let Some(els) = &s.els {
                    self.resolve_stmt(els);
                }
                self.scopes.pop();
            }
            Stmt::For(s) => {
                self.scopes.push(HashMap::new());
                if let Some(init) = &s.init {
                    self.resolve_stmt(init);
                }
                if let Some(cond) = &s.cond {
                    self.resolve_expr(cond);
                }
                if let Some(post) = &s.post {
                    self.resolve_stmt(post);
                }
                self.resolve_block(&s.body);
                self.scopes.pop();
            }
            Stmt::Range(s) => {
                self.scopes.push(HashMap::new());
                let tx = self.resolve_expr(&s.x);
                let (kty, vty) = self.range_binding_types(&tx);
                if s.define {
                    self.bind_range_var(&s.key, kty);
                    self.bind_range_var(&s.value, vty);
                } else {
                    if let Some(key) = &s.key {
                        self.resolve_expr(key);
                    }
                    if let Some(value) = &s.value {
                        self.resolve_expr(value);
                    }
                }
                self.resolve_block(&s.body);
                self.scopes.pop();
            }
            Stmt::Switch(s) => {
                self.scopes.push(HashMap::new());
                if let Some(init) = &s.init {
                    self.resolve_stmt(init);
                }
                if let Some(tag) = &s.tag {
                    self.resolve_expr(tag);
                }
                for case in &s.cases {
                    for expr in &case.exprs {
                        self.resolve_expr(expr);
                    }
                    self.scopes.push(HashMap::new());
                    self.resolve_stmts(&case.body);
                    self.scopes.pop();
                }
                self.scopes.pop();
            }
            Stmt::Select(s) => {
                for case in &s.cases {
                    self.scopes.push(HashMap::new());
                    if let Some(comm) = &case.comm {
                        self.resolve_stmt(comm);
                    }
                    self.resolve_stmts(&case.body);
                    self.scopes.pop();
                }
            }
            Stmt::Labeled { stmt, .. } => self.resolve_stmt(stmt),
        }
    }

    fn resolve_local_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(d) => {
                for spec in &d.specs {
                    let value_tys: Vec<Type> =
                        spec.values.iter().map(|v| self.resolve_expr(v)).collect();
                    let declared = spec.ty.as_ref().map(type_from_ast);
                    for (i, name) in spec.names.iter().enumerate() {
                        let ty = declared
                            .clone()
                            .or_else(|| value_tys.get(i).cloned())
                            .unwrap_or(Type::Unknown);
                        self.bind(name, Entity::Var, ty);
                    }
                }
            }
            Decl::Const(d) => {
                for spec in &d.specs {
                    for value in &spec.values {
                        self.resolve_expr(value);
                    }
                    for name in &spec.names {
                        self.bind(name, Entity::Const, Type::Unknown);
                    }
                }
            }
            Decl::Type(d) => {
                self.type_defs.insert(
                    d.name.clone(),
                    TypeDef {
                        underlying: type_from_ast(&d.ty),
                        is_alias: d.is_alias,
                    },
                );
                self.bind(&d.name, Entity::Type, Type::Named(d.name.clone()));
            }
            Decl::Func(f) => self.resolve_func(f),
        }
    }

    fn resolve_define(&mut self, lhs: &[Expr], rhs_tys: &[Type]) {
        let expanded: Vec<Type> = if lhs.len() > 1 && rhs_tys.len() == 1 {
            match &rhs_tys[0] {
                Type::Tuple(ts) if ts.len() == lhs.len() => ts.clone(),
                // Two-value forms: map index, type assertion, receive.
                t if lhs.len() == 2 => vec![t.clone(), Type::Named("bool".into())],
                _ => vec![Type::Unknown; lhs.len()],
            }
        } else {
            rhs_tys.to_vec()
        };
        for (i, l) in lhs.iter().enumerate() {
            match &l.kind {
                ExprKind::Ident(name) if name == "_" => {}
                ExprKind::Ident(name) => {
                    if self.current_scope_has(name) {
                        // Redeclaration in the same scope: an ordinary
                        // use, assigned rather than introduced.
                        self.resolve_expr(l);
                    } else {
                        let ty = expanded.get(i).cloned().unwrap_or(Type::Unknown);
                        self.bind(name, Entity::Var, ty.clone());
                        self.defs.insert(l.id);
                        if ty != Type::Unknown {
                            self.expr_types.insert(l.id, ty);
                        }
                    }
                }
                _ => {
                    self.resolve_expr(l);
                }
            }
        }
    }

    fn bind_range_var(&mut self, var: &Option<Expr>, ty: Type) {
        let Some(expr) = var else {
            return;
        };
        match &expr.kind {
            ExprKind::Ident(name) if name == "_" => {}
            ExprKind::Ident(name) => {
                self.bind(name, Entity::Var, ty.clone());
                self.defs.insert(expr.id);
                if ty != Type::Unknown {
                    self.expr_types.insert(expr.id, ty);
                }
            }
            _ => {
                self.resolve_expr(expr);
            }
        }
    }

    fn range_binding_types(&self, tx: &Type) -> (Type, Type) {
        match self.type_defs.underlying(tx) {
            Type::Slice(e) | Type::Array(e) => (Type::Named("int".into()), (**e).clone()),
            Type::Map(k, v) => ((**k).clone(), (**v).clone()),
            Type::Chan(e) => ((**e).clone(), Type::Unknown),
            Type::Named(n) if n == "string" => {
                (Type::Named("int".into()), Type::Named("rune".into()))
            }
            _ => (Type::Unknown, Type::Unknown),
        }
    }

    fn record(&mut self, id: ExprId, ty: Type) -> Type {
        if ty != Type::Unknown {
            self.expr_types.insert(id, ty.clone());
        }
        ty
    }

    fn resolve_expr(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::Ident(name) => {
                if name == "_" {
                    return Type::Unknown;
                }
                if let Some(binding) = self.lookup(name) {
                    let entity = binding.entity;
                    let ty = binding.ty.clone();
                    self.uses.insert(expr.id, entity);
                    return self.record(expr.id, ty);
                }
                if !is_universe_value(name) {
                    self.note_unresolved(name, &expr.span);
                }
                Type::Unknown
            }
            ExprKind::BasicLit { kind, .. } => {
                let ty = match kind {
                    LitKind::Int => Type::Named("int".into()),
                    LitKind::Float => Type::Named("float64".into()),
                    LitKind::Char => Type::Named("rune".into()),
                    LitKind::String => Type::Named("string".into()),
                };
                self.record(expr.id, ty)
            }
            ExprKind::CompositeLit { ty, elems } => {
                let t = ty.as_ref().map(type_from_ast).unwrap_or(Type::Unknown);
                let struct_like = matches!(
                    self.type_defs.underlying(&t),
                    Type::Struct(_) | Type::Unknown | Type::Named(_)
                );
                for elem in elems {
                    if let Some(key) = &elem.key {
                        let ident_key = matches!(key.kind, ExprKind::Ident(_));
                        if !(struct_like && ident_key) {
                            self.resolve_expr(key);
                        }
                    }
                    self.resolve_expr(&elem.value);
                }
                self.record(expr.id, t)
            }
            ExprKind::FuncLit {
                params,
                results,
                body,
            } => {
                self.scopes.push(HashMap::new());
                self.bind_params(params);
                self.bind_params(results);
                self.resolve_stmts(&body.stmts);
                self.scopes.pop();
                self.record(expr.id, func_type(params, results))
            }
            ExprKind::Paren(inner) => {
                let ty = self.resolve_expr(inner);
                self.record(expr.id, ty)
            }
            ExprKind::Selector { x, sel } => {
                if let ExprKind::Ident(name) = &x.kind {
                    let is_package = self
                        .lookup(name)
                        .map(|b| b.entity == Entity::Package)
                        .unwrap_or(false);
                    if is_package {
                        self.uses.insert(x.id, Entity::Package);
                        let path = self.package_paths.get(name).cloned();
                        if let Some(path) = path {
                            if let Some(exports) = self.importer.exports(&path) {
                                if let Some(entity) = exports.entities.get(&sel.name) {
                                    self.uses.insert(sel.id, *entity);
                                }
                            }
                        }
                        return Type::Unknown;
                    }
                }
                let tx = self.resolve_expr(x);
                let peeled = match self.type_defs.underlying(&tx) {
                    Type::Pointer(inner) => (**inner).clone(),
                    _ => tx.clone(),
                };
                if let Type::Named(base) = &peeled {
                    if let Some(sig) = self
                        .methods
                        .get(base)
                        .and_then(|m| m.get(&sel.name))
                        .cloned()
                    {
                        self.uses.insert(sel.id, Entity::Func);
                        return self.record(expr.id, sig);
                    }
                }
                if let Type::Struct(fields) = self.type_defs.underlying(&peeled).clone() {
                    if let Some((_, fty)) = fields.into_iter().find(|(n, _)| n == &sel.name) {
                        self.uses.insert(sel.id, Entity::Field);
                        return self.record(expr.id, fty);
                    }
                }
                Type::Unknown
            }
            ExprKind::Index { x, index } => {
                let tx = self.resolve_expr(x);
                self.resolve_expr(index);
                let elem = match self.type_defs.underlying(&tx) {
                    Type::Slice(e) | Type::Array(e) => (**e).clone(),
                    Type::Map(_, v) => (**v).clone(),
                    Type::Named(n) if n == "string" => Type::Named("byte".into()),
                    _ => Type::Unknown,
                };
                self.record(expr.id, elem)
            }
            ExprKind::Slice { x, low, high, max } => {
                let tx = self.resolve_expr(x);
                for part in [low, high, max].into_iter().flatten() {
                    self.resolve_expr(part);
                }
                self.record(expr.id, tx)
            }
            ExprKind::TypeAssert { x, ty } => {
                self.resolve_expr(x);
                let t = type_from_ast(ty);
                self.record(expr.id, t)
            }
            ExprKind::Call { fun, args, .. } => {
                if let ExprKind::Ident(name) = &fun.kind {
                    if self.lookup(name).is_none() && is_universe_value(name) {
                        let arg_tys: Vec<Type> =
                            args.iter().map(|a| self.resolve_expr(a)).collect();
                        let ty = match name.as_str() {
                            "make" => arg_tys.first().cloned().unwrap_or(Type::Unknown),
                            "new" => arg_tys
                                .first()
                                .cloned()
                                .map(|t| Type::Pointer(Box::new(t)))
                                .unwrap_or(Type::Unknown),
                            "len" | "cap" => Type::Named("int".into()),
                            "append" => arg_tys.first().cloned().unwrap_or(Type::Unknown),
                            _ => Type::Unknown,
                        };
                        return self.record(expr.id, ty);
                    }
                }
                let tfun = self.resolve_expr(fun);
                for arg in args {
                    self.resolve_expr(arg);
                }
                // Conversions: a type used in call position.
                if matches!(fun.kind, ExprKind::TypeExpr(_))
                    || self.uses.get(&fun.id) == Some(&Entity::Type)
                {
                    return self.record(expr.id, tfun);
                }
                let ty = match self.type_defs.underlying(&tfun) {
                    Type::Func { results, .. } => match results.len() {
                        0 => Type::Unknown,
                        1 => results[0].clone(),
                        _ => Type::Tuple(results.clone()),
                    },
                    _ => Type::Unknown,
                };
                self.record(expr.id, ty)
            }
            ExprKind::Star(x) => {
                let tx = self.resolve_expr(x);
                let ty = match self.type_defs.underlying(&tx) {
                    Type::Pointer(e) => (**e).clone(),
                    _ => Type::Unknown,
                };
                self.record(expr.id, ty)
            }
            ExprKind::Unary { op, x } => {
                let tx = self.resolve_expr(x);
                let ty = match op {
                    UnaryOp::And => Type::Pointer(Box::new(tx)),
                    UnaryOp::Recv => match self.type_defs.underlying(&tx) {
                        Type::Chan(e) => (**e).clone(),
                        _ => Type::Unknown,
                    },
                    UnaryOp::Not => Type::Named("bool".into()),
                    UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Xor => tx,
                };
                self.record(expr.id, ty)
            }
            ExprKind::Binary { op, x, y } => {
                let tx = self.resolve_expr(x);
                self.resolve_expr(y);
                let ty = match op {
                    BinaryOp::LOr
                    | BinaryOp::LAnd
                    | BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::Lte
                    | BinaryOp::Gt
                    | BinaryOp::Gte => Type::Named("bool".into()),
                    _ => tx,
                };
                self.record(expr.id, ty)
            }
            ExprKind::TypeExpr(ty) => {
                let t = type_from_ast(ty);
                self.record(expr.id, t)
            }
        }
    }
}

fn func_type(params: &[Param], results: &[Param]) -> Type {
    let flatten = |groups: &[Param]| -> Vec<Type> {
        groups
            .iter()
            .flat_map(|p| {
                let ty = match &p.ty.kind {
                    TypeAstKind::Ellipsis(inner) => {
                        Type::Slice(Box::new(type_from_ast(inner)))
                    }
                    _ => type_from_ast(&p.ty),
                };
                let n = p.names.len().max(1);
                std::iter::repeat(ty).take(n)
            })
            .collect()
    };
    Type::Func {
        params: flatten(params),
        results: flatten(results),
    }
}

// Best near-miss among the visible names for an advisory note. The
// edit-distance budget scales with the name so short names only match
// off-by-one typos; ties break toward the shorter, then lexicographically
// first candidate so notes stay deterministic.
fn closest_name(target: &str, candidates: impl Iterator<Item = String>) -> Option<String> {
    let budget = match target.len() {
        0 => return None,
        1..=3 => 1,
        4..=7 => 2,
        _ => 3,
    };
    candidates
        .filter(|c| !c.is_empty() && c != target)
        .map(|c| (levenshtein(target, &c), c))
        .filter(|(dist, _)| *dist <= budget)
        .min_by(|(da, a), (db, b)| da.cmp(db).then(a.len().cmp(&b.len())).then(a.cmp(b)))
        .map(|(_, name)| name)
}

fn recv_base_name(ty: &TypeAst) -> Option<String> {
    match &ty.kind {
        TypeAstKind::Named(name) => Some(name.clone()),
        TypeAstKind::Pointer(inner) => recv_base_name(inner),
        _ => None,
    }
}

// Predeclared non-type names. These are deliberately not scope entries:
// the instrumentation passes filter them by name, so the resolver only
// needs to avoid flagging them as unresolved.
fn is_universe_value(name: &str) -> bool {
    matches!(
        name,
        "append"
            | "cap"
            | "close"
            | "complex"
            | "copy"
            | "delete"
            | "imag"
            | "len"
            | "make"
            | "new"
            | "panic"
            | "print"
            | "println"
            | "real"
            | "recover"
            | "true"
            | "false"
            | "nil"
            | "iota"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;

    fn resolve_src(src: &str) -> (Vec<FileAst>, TypeInfo) {
        let tokens = Lexer::new(src).lex_all();
        let mut parser = Parser::new(tokens);
        let file = parser.parse_file().expect("parse");
        assert!(parser.diags.is_empty(), "parse diagnostics");
        let files = vec![file];
        let info = resolve(&files, &NullImporter);
        (files, info)
    }

    fn find_ident<'e>(file: &'e FileAst, name: &str) -> Vec<ExprId> {
        let mut out = Vec::new();
        fn walk_expr(expr: &Expr, name: &str, out: &mut Vec<ExprId>) {
            match &expr.kind {
                ExprKind::Ident(n) if n == name => out.push(expr.id),
                ExprKind::Paren(x) | ExprKind::Star(x) => walk_expr(x, name, out),
                ExprKind::Unary { x, .. } => walk_expr(x, name, out),
                ExprKind::Binary { x, y, .. } => {
                    walk_expr(x, name, out);
                    walk_expr(y, name, out);
                }
                ExprKind::Selector { x, .. } => walk_expr(x, name, out),
                ExprKind::Index { x, index } => {
                    walk_expr(x, name, out);
                    walk_expr(index, name, out);
                }
                ExprKind::Call { fun, args, .. } => {
                    walk_expr(fun, name, out);
                    for a in args {
                        walk_expr(a, name, out);
                    }
                }
                _ => {}
            }
        }
        fn walk_stmts(stmts: &[Stmt], name: &str, out: &mut Vec<ExprId>) {
            for stmt in stmts {
                match stmt {
                    Stmt::Assign { lhs, rhs, .. } => {
                        for e in lhs.iter().chain(rhs) {
                            walk_expr(e, name, out);
                        }
                    }
                    Stmt::Expr { expr, .. } => walk_expr(expr, name, out),
                    Stmt::IncDec { expr, .. } => walk_expr(expr, name, out),
                    Stmt::Block(b) => walk_stmts(&b.stmts, name, out),
                    Stmt::If(s) => {
                        walk_expr(&s.cond, name, out);
                        walk_stmts(&s.then.stmts, name, out);
                    }
                    Stmt::For(s) => {
                        if let Some(c) = &s.cond {
                            walk_expr(c, name, out);
                        }
                        walk_stmts(&s.body.stmts, name, out);
                    }
                    _ => {}
                }
            }
        }
        for decl in &file.decls {
            if let Decl::Func(f) = decl {
                if let Some(body) = &f.body {
                    walk_stmts(&body.stmts, name, &mut out);
                }
            }
        }
        out
    }

    #[test]
    fn define_records_def_and_reuse_records_use() {
        let (files, info) = resolve_src(
            "package main\nfunc main() {\n\tx := 10\n\tx = 20\n\ty := x + 5\n\t_ = y\n}\n",
        );
        let xs = find_ident(&files[0], "x");
        assert_eq!(xs.len(), 3);
        assert!(info.defines(xs[0]));
        assert!(!info.defines(xs[1]));
        assert_eq!(info.entity_of(xs[1]), Some(Entity::Var));
        assert_eq!(info.entity_of(xs[2]), Some(Entity::Var));
    }

    #[test]
    fn redeclaration_in_same_scope_is_not_a_def() {
        let (files, info) = resolve_src(
            "package main\nfunc main() {\n\tx := 10\n\tx, y := 20, 30\n\t_, _ = x, y\n}\n",
        );
        let xs = find_ident(&files[0], "x");
        assert!(info.defines(xs[0]));
        assert!(!info.defines(xs[1]));
        let ys = find_ident(&files[0], "y");
        assert!(info.defines(ys[0]));
    }

    #[test]
    fn inner_scope_define_shadows_and_defines() {
        let (files, info) = resolve_src(
            "package main\nfunc main() {\n\tx := 1\n\t{\n\t\tx := 2\n\t\t_ = x\n\t}\n\t_ = x\n}\n",
        );
        let xs = find_ident(&files[0], "x");
        assert!(info.defines(xs[0]));
        assert!(info.defines(xs[1]));
    }

    #[test]
    fn map_and_slice_types_are_distinguished() {
        let (files, info) = resolve_src(
            "package main\nfunc main() {\n\tarr := []int{1, 2, 3}\n\tm := map[string]int{\"a\": 1}\n\tarr[0] = m[\"a\"]\n\tm[\"b\"] = arr[1]\n}\n",
        );
        let arrs = find_ident(&files[0], "arr");
        let ms = find_ident(&files[0], "m");
        // Occurrences after the defines are indexing bases.
        assert!(info.is_known_non_map(arrs[1]));
        assert!(!info.is_known_non_map(ms[1]));
    }

    #[test]
    fn named_map_type_is_still_a_map() {
        let (files, info) = resolve_src(
            "package main\ntype Registry map[string]int\nfunc main() {\n\tvar r Registry\n\tr[\"a\"] = 1\n}\n",
        );
        let rs = find_ident(&files[0], "r");
        assert!(!info.is_known_non_map(rs[0]));
    }

    #[test]
    fn package_selector_and_field_entities() {
        let (files, info) = resolve_src(
            "package main\nimport \"fmt\"\ntype Point struct {\n\tX int\n}\nfunc main() {\n\tpt := Point{X: 1}\n\tpt.X = 2\n\tfmt.Println(pt.X)\n}\n",
        );
        let fmts = find_ident(&files[0], "fmt");
        assert_eq!(info.entity_of(fmts[0]), Some(Entity::Package));
        // Struct field selector members resolve to fields.
        assert!(info
            .uses
            .values()
            .any(|e| matches!(e, Entity::Field)));
    }

    #[test]
    fn consts_and_funcs_classified() {
        let (files, info) = resolve_src(
            "package main\nconst MAX = 100\nfunc helper() int {\n\treturn 1\n}\nfunc main() {\n\tx := MAX + helper()\n\t_ = x\n}\n",
        );
        let maxes = find_ident(&files[0], "MAX");
        assert_eq!(info.entity_of(maxes[0]), Some(Entity::Const));
        let helpers = find_ident(&files[0], "helper");
        assert_eq!(info.entity_of(helpers[0]), Some(Entity::Func));
    }

    #[test]
    fn unresolved_names_become_notes_not_errors() {
        let (_, info) = resolve_src(
            "package main\nfunc main() {\n\tvalue := 1\n\t_ = valu\n}\n",
        );
        assert_eq!(info.notes.len(), 1);
        assert!(info.notes[0].message.contains("valu"));
        assert!(info.notes[0].message.contains("did you mean `value`?"));
    }

    #[test]
    fn name_suggestions_stay_within_budget_and_deterministic() {
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        // Short names only tolerate a single edit.
        assert_eq!(
            closest_name("ch", names(&["cn", "chan2", "done"]).into_iter()),
            Some("cn".to_string())
        );
        assert_eq!(closest_name("ch", names(&["done", "wg"]).into_iter()), None);
        // Equal distances break toward the shorter candidate.
        assert_eq!(
            closest_name("count", names(&["counts", "coun"]).into_iter()),
            Some("coun".to_string())
        );
    }

    #[test]
    fn method_receivers_resolve_to_funcs() {
        let (_, info) = resolve_src(
            "package counter\ntype Counter struct {\n\tvalue int\n}\nfunc (c *Counter) Increment() {\n\tc.value++\n}\nfunc use() {\n\tc := &Counter{value: 0}\n\tc.Increment()\n}\n",
        );
        assert!(info.uses.values().any(|e| matches!(e, Entity::Func)));
        assert!(info.uses.values().any(|e| matches!(e, Entity::Field)));
    }
}
