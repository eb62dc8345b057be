//! The evaluator core: an AST walker dispatching on tree-sitter node kind,
//! with a single `eval` entry point for expressions and statements and
//! `apply` as the entry point for symbolic execution of a function.

pub(crate) mod call;
pub(crate) mod expr;
pub(crate) mod generics;
pub(crate) mod methods;
pub(crate) mod stmt;

use crate::config::EvalConfig;
use crate::context::Context;
use crate::env::{EnvRef, Environment};
use crate::error::{EvalError, Frame};
use crate::finalize::{FinalizeReport, FinalizeState, InterfaceCallSite};
use crate::intrinsics::IntrinsicRegistry;
use crate::memo::MemoCache;
use crate::object::{IntrinsicHandler, Object, PackageObj};
use crate::policy::SharedPolicy;
use crate::resolver::{PackageInfo, SharedResolver};
use crate::tracer::Tracer;
use crate::types::{FileId, Range};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

pub struct Evaluator {
    resolver: SharedResolver,
    policy: SharedPolicy,
    tracer: RefCell<Box<dyn Tracer>>,
    pub(crate) intrinsics: RefCell<IntrinsicRegistry>,
    memo: RefCell<MemoCache>,
    config: EvalConfig,
    universe: EnvRef,

    /// Package objects created so far, keyed by import path. Distinct from
    /// the resolver's own cache: this is the evaluator's view (env +
    /// `PackageInfo` pairing), not the raw parse.
    packages: RefCell<HashMap<String, Rc<PackageObj>>>,

    /// Every `PackageInfo` the evaluator has seen, entry points and
    /// deep-scanned dependencies alike — finalization walks this to
    /// discover concrete implementers.
    known_packages: RefCell<HashMap<String, Arc<PackageInfo>>>,

    /// Diagnostic call stack, also used for recursion detection.
    call_stack: RefCell<Vec<ActiveCall>>,

    finalize_state: RefCell<FinalizeState>,

    /// Manual interface→concrete-type overrides from `BindInterface`.
    bound_interfaces: RefCell<HashMap<String, String>>,
}

#[derive(Clone)]
struct ActiveCall {
    function_identity: usize,
    signature: String,
    frame: Frame,
}

impl Evaluator {
    pub fn new(
        resolver: SharedResolver,
        tracer: Box<dyn Tracer>,
        policy: SharedPolicy,
        config: EvalConfig,
    ) -> Self {
        let universe = Environment::universe();
        let mut intrinsics = IntrinsicRegistry::new();
        install_default_error_intrinsics(&mut intrinsics);

        Self {
            resolver,
            policy,
            tracer: RefCell::new(tracer),
            intrinsics: RefCell::new(intrinsics),
            memo: RefCell::new(MemoCache::new(config.memoize)),
            config,
            universe,
            packages: RefCell::new(HashMap::new()),
            known_packages: RefCell::new(HashMap::new()),
            call_stack: RefCell::new(Vec::new()),
            finalize_state: RefCell::new(FinalizeState::default()),
            bound_interfaces: RefCell::new(HashMap::new()),
        }
    }

    pub fn register_intrinsic(&self, key: impl Into<String>, handler: IntrinsicHandler) {
        self.intrinsics.borrow_mut().register(key, handler);
    }

    pub fn register_default_intrinsic(&self, handler: IntrinsicHandler) {
        self.intrinsics.borrow_mut().register_default(handler);
    }

    pub fn push_intrinsics(&self) {
        self.intrinsics.borrow_mut().push();
    }

    pub fn pop_intrinsics(&self) {
        self.intrinsics.borrow_mut().pop();
    }

    /// Manual interface→concrete-type mapping, used when a tool wants to
    /// force a single implementation.
    pub fn bind_interface(&self, qualified_interface: impl Into<String>, concrete_type: impl Into<String>) {
        self.bound_interfaces
            .borrow_mut()
            .insert(qualified_interface.into(), concrete_type.into());
    }

    pub(crate) fn bound_interface_of(&self, qualified_interface: &str) -> Option<String> {
        self.bound_interfaces.borrow().get(qualified_interface).cloned()
    }

    pub fn finalize(&self, _ctx: &Context) -> FinalizeReport {
        crate::finalize::run(&self.finalize_state.borrow(), &self.known_packages.borrow())
    }

    pub(crate) fn record_interface_call(&self, site: InterfaceCallSite) {
        self.finalize_state.borrow_mut().sites.push(site);
    }

    /// Records a direct (statically resolved) call for finalization's call
    /// graph and invokes the default intrinsic, which is called with
    /// `(function-name, args...)` on every call, successful or not — the
    /// side channel tools use for usage tracking.
    pub(crate) fn record_call(&self, function_name: &str, args: &[Object], file: Option<FileId>, range: Range) {
        if let Some(default) = self.intrinsics.borrow().default_intrinsic() {
            let mut recorded = vec![Object::Str(function_name.into())];
            recorded.extend_from_slice(args);
            default(self, &Context::new(), &recorded);
        }
        self.finalize_state
            .borrow_mut()
            .direct_calls
            .push((function_name.to_string(), file, range));
    }

    pub(crate) fn trace(&self, file: Option<FileId>, node_kind: &str, range: Range) {
        self.tracer.borrow_mut().visit(file, node_kind, range);
    }

    pub(crate) fn intrinsic_lookup(&self, key: &str) -> Option<IntrinsicHandler> {
        self.intrinsics.borrow().lookup(key)
    }

    pub(crate) fn memo_get(&self, f: &Rc<crate::object::FunctionObj>, args: &[Object]) -> Option<Object> {
        self.memo.borrow().get(f, args)
    }

    pub(crate) fn memo_insert(&self, f: &Rc<crate::object::FunctionObj>, args: &[Object], result: Object) {
        self.memo.borrow_mut().insert(f, args, result);
    }

    pub fn universe(&self) -> &EnvRef {
        &self.universe
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub(crate) fn policy(&self) -> &SharedPolicy {
        &self.policy
    }

    /// Seeds a package environment from one already-scanned `PackageInfo`
    /// — the entry point for top-level files, binding functions, types,
    /// vars and constants into the package env.
    pub fn load_package(&self, info: Arc<PackageInfo>) -> Rc<PackageObj> {
        if let Some(existing) = self.packages.borrow().get(&info.import_path) {
            return existing.clone();
        }

        let env = Environment::enclosed(&self.universe);
        let pkg = Rc::new(PackageObj {
            import_path: info.import_path.clone(),
            name: info.name.clone(),
            env: env.clone(),
        });

        for function in &info.functions {
            if function.receiver.is_some() {
                continue; // methods are looked up via the type, not bound as package names
            }
            let obj = Object::Function(Rc::new(crate::object::FunctionObj {
                info: function.clone(),
                body: function.body.clone(),
                defining_package: info.import_path.clone(),
                env: env.clone(),
                receiver: None,
                type_args: Vec::new(),
            }));
            env.set_local(function.name.clone(), obj);
        }

        for constant in &info.constants {
            let value = constant
                .raw_value
                .as_deref()
                .and_then(parse_literal)
                .unwrap_or_else(|| Object::placeholder("unresolved constant", constant.type_hint.clone()));
            env.set_local(constant.name.clone(), value);
        }

        self.known_packages
            .borrow_mut()
            .insert(info.import_path.clone(), info.clone());
        self.packages
            .borrow_mut()
            .insert(info.import_path.clone(), pkg.clone());
        pkg
    }

    pub(crate) fn known_package(&self, import_path: &str) -> Option<Arc<PackageInfo>> {
        self.known_packages.borrow().get(import_path).cloned()
    }

    pub(crate) fn known_packages_snapshot(&self) -> Vec<Arc<PackageInfo>> {
        self.known_packages.borrow().values().cloned().collect()
    }

    /// Resolves `import_path` through the scan policy and resolver:
    /// out-of-policy paths never reach the resolver in deep mode and come
    /// back as an empty package stand-in instead.
    pub(crate) fn resolve_package(&self, ctx: &Context, import_path: &str) -> Object {
        if let Some(existing) = self.packages.borrow().get(import_path) {
            return Object::Package(existing.clone());
        }

        if !self.policy.is_in_policy(import_path) {
            tracing::debug!(import_path, "package is out of scan policy, shallow only");
            let env = Environment::enclosed(&self.universe);
            let pkg = Rc::new(PackageObj {
                import_path: import_path.to_string(),
                name: import_path.rsplit('/').next().unwrap_or(import_path).to_string(),
                env,
            });
            self.packages.borrow_mut().insert(import_path.to_string(), pkg.clone());
            return Object::Package(pkg);
        }

        match self.resolver.scan_package_by_import(ctx, import_path) {
            Ok(info) => Object::Package(self.load_package(info)),
            Err(err) => Object::Error(Rc::new(EvalError::Resolver(err.to_string()))),
        }
    }

    pub(crate) fn call_stack_frames(&self) -> Vec<Frame> {
        self.call_stack.borrow().iter().map(|c| c.frame.clone()).collect()
    }

    /// Pushes a call frame. Returns `true` if this call is a direct cycle
    /// and should be short-circuited to a placeholder instead of evaluated.
    pub(crate) fn enter_call(&self, function_identity: usize, signature: String, frame: Frame) -> bool {
        let repeats = self
            .call_stack
            .borrow()
            .iter()
            .filter(|c| c.function_identity == function_identity && c.signature == signature)
            .count();

        self.call_stack.borrow_mut().push(ActiveCall {
            function_identity,
            signature,
            frame,
        });

        repeats >= 1
    }

    pub(crate) fn call_depth(&self) -> usize {
        self.call_stack.borrow().len()
    }

    pub(crate) fn recursion_cap(&self) -> usize {
        self.config.recursion_cap
    }

    pub(crate) fn exit_call(&self) {
        self.call_stack.borrow_mut().pop();
    }

    /// Evaluates one tree-sitter node — expression or statement — in
    /// `env`, within the lexical package `pkg`. Unknown node kinds become
    /// `Object::Error(EvalError::Unsupported)` rather than a panic — this
    /// engine never panics on malformed or unsupported input.
    pub fn eval(
        &self,
        ctx: &Context,
        node: tree_sitter::Node,
        env: &EnvRef,
        pkg: &Rc<PackageObj>,
        file: &Arc<crate::types::SourceFile>,
    ) -> Object {
        if ctx.is_cancelled() {
            return Object::Error(Rc::new(EvalError::Resolver("analysis cancelled".to_string())));
        }
        self.trace(Some(file.id), node.kind(), Range::from_ts(&node));

        if expr::is_expr_kind(node.kind()) {
            expr::eval_expr(self, ctx, node, env, pkg, file)
        } else {
            stmt::eval_stmt(self, ctx, node, env, pkg, file)
        }
    }

    /// Symbolically executes `callee` with `args`. Intrinsics take
    /// priority over user-defined bodies; bodies without a parse-able
    /// `FunctionBody` degrade to a return-typed placeholder.
    pub fn apply(&self, ctx: &Context, callee: &Object, args: Vec<Object>) -> Object {
        call::apply(self, ctx, callee, args)
    }
}

fn install_default_error_intrinsics(registry: &mut IntrinsicRegistry) {
    registry.register(
        "errors.New",
        Rc::new(|_: &Evaluator, _: &Context, args: &[Object]| {
            let message = args.first().cloned().unwrap_or(Object::Nil);
            Object::Instance(Rc::new(crate::object::Instance {
                type_name: "errors.errorString".to_string(),
                type_info: Some(crate::resolver::FieldType::named("error")),
                state: std::cell::RefCell::new(std::collections::HashMap::from([(
                    "msg".to_string(),
                    message,
                )])),
            }))
        }) as IntrinsicHandler,
    );

    registry.register(
        "fmt.Errorf",
        Rc::new(|_: &Evaluator, _: &Context, args: &[Object]| {
            let message = args.first().cloned().unwrap_or(Object::Nil);
            Object::Instance(Rc::new(crate::object::Instance {
                type_name: "fmt.wrapError".to_string(),
                type_info: Some(crate::resolver::FieldType::named("error")),
                state: std::cell::RefCell::new(std::collections::HashMap::from([
                    ("msg".to_string(), message),
                    ("wrapped".to_string(), args.get(1).cloned().unwrap_or(Object::Nil)),
                ])),
            }))
        }) as IntrinsicHandler,
    );

    registry.register(
        "errors.Is",
        Rc::new(|_: &Evaluator, _: &Context, _args: &[Object]| {
            Object::placeholder("errors.Is result", Some(crate::resolver::FieldType::builtin("bool")))
        }) as IntrinsicHandler,
    );

    registry.register(
        "errors.As",
        Rc::new(|_: &Evaluator, _: &Context, _args: &[Object]| {
            Object::placeholder("errors.As result", Some(crate::resolver::FieldType::builtin("bool")))
        }) as IntrinsicHandler,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goscan::GoModuleResolver;
    use crate::policy::PrefixPolicy;
    use crate::tracer::NullTracer;
    use std::path::Path;

    fn write_go_file(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    /// The shallow-scan boundary: an in-policy import resolves to a real,
    /// deep-scanned package, while an out-of-policy one never reaches the
    /// resolver and comes back as an empty stand-in that finalization
    /// never sees.
    #[test]
    fn out_of_policy_imports_stay_shallow_while_in_policy_ones_scan() {
        let dir = tempfile::tempdir().unwrap();
        write_go_file(
            dir.path(),
            "app.go",
            "package app\n\nfunc Run() int {\n\treturn 1\n}\n",
        );

        let mut roots = HashMap::new();
        roots.insert("example.com/app".to_string(), dir.path().to_path_buf());
        let resolver: SharedResolver = Arc::new(GoModuleResolver::new(roots));
        let policy: SharedPolicy = Arc::new(PrefixPolicy::new(vec!["example.com/app".to_string()]));
        let evaluator = Evaluator::new(resolver, Box::new(NullTracer), policy, EvalConfig::default());
        let ctx = Context::new();

        let in_policy = evaluator.resolve_package(&ctx, "example.com/app");
        match in_policy {
            Object::Package(pkg) => assert!(pkg.env.get("Run").is_some()),
            other => panic!("expected a loaded package, got {other:?}"),
        }
        assert!(evaluator.known_package("example.com/app").is_some());

        let out_of_policy = evaluator.resolve_package(&ctx, "example.com/vendor/widgets");
        match out_of_policy {
            Object::Package(pkg) => {
                assert_eq!(pkg.import_path, "example.com/vendor/widgets");
                assert!(pkg.env.get("AnythingAtAll").is_none());
            }
            other => panic!("expected a shallow package stand-in, got {other:?}"),
        }
        assert!(evaluator.known_package("example.com/vendor/widgets").is_none());
    }

    #[test]
    fn recursion_cap_backstop_terminates_varying_argument_recursion() {
        let dir = tempfile::tempdir().unwrap();
        write_go_file(
            dir.path(),
            "sum.go",
            "package sum\n\nfunc Sum(n int) int {\n\tif n <= 0 {\n\t\treturn 0\n\t} else {\n\t\treturn n + Sum(n-1)\n\t}\n}\n",
        );

        let mut roots = HashMap::new();
        roots.insert("example.com/sum".to_string(), dir.path().to_path_buf());
        let resolver: SharedResolver = Arc::new(GoModuleResolver::new(roots));
        let policy: SharedPolicy = Arc::new(crate::policy::AllowAllPolicy);
        let mut config = EvalConfig::default();
        config.recursion_cap = 8;
        let evaluator = Evaluator::new(resolver.clone(), Box::new(NullTracer), policy, config);
        let ctx = Context::new();

        let info = resolver.scan_package_by_import(&ctx, "example.com/sum").unwrap();
        let pkg = evaluator.load_package(info);
        let sum = pkg.env.get("Sum").unwrap();

        // `n` only ever decreases, so every recursive call carries a fresh
        // literal signature — the identity-plus-signature cycle guard never
        // fires, and only the depth backstop stops this from recursing
        // through Rust's own call stack forever.
        let result = evaluator.apply(&ctx, &sum, vec![Object::Integer(3)]);
        assert!(evaluator.call_depth() == 0, "call stack must be fully unwound");
        assert!(!matches!(result, Object::Error(_)));
    }
}

fn parse_literal(raw: &str) -> Option<Object> {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Object::Integer(i));
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Some(Object::Float(f));
    }
    if trimmed == "true" {
        return Some(Object::Boolean(true));
    }
    if trimmed == "false" {
        return Some(Object::Boolean(false));
    }
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        return Some(Object::Str(trimmed[1..trimmed.len() - 1].into()));
    }
    None
}
