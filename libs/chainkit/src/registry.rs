//! Module table of a core, capability lookup, and static module discovery.

use std::any::type_name;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::contracts::{capability, Module, NetworkModule};
use crate::errors::CoreError;
use crate::Core;

/// Per-module lifecycle state, advanced only by the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleState {
    Constructed,
    SetupComplete,
    Started,
    /// `start` returned an error.
    Failed,
}

pub struct ModuleEntry {
    pub name: &'static str,
    pub capabilities: &'static [&'static str],
    pub core: Arc<dyn Module>,
    state: RwLock<ModuleState>,
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state())
            .finish()
    }
}

impl ModuleEntry {
    pub(crate) fn new(module: Arc<dyn Module>) -> Self {
        Self {
            name: module.name(),
            capabilities: module.capabilities(),
            core: module,
            state: RwLock::new(ModuleState::Constructed),
        }
    }

    pub fn state(&self) -> ModuleState {
        *self.state.read()
    }

    pub(crate) fn set_state(&self, state: ModuleState) {
        *self.state.write() = state;
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| *c == capability)
    }
}

fn downcast<T: Module>(name: &str, module: Arc<dyn Module>) -> Result<Arc<T>, CoreError> {
    module
        .into_any_arc()
        .downcast::<T>()
        .map_err(|_| CoreError::ModuleTypeMismatch {
            module: name.to_string(),
            expected: type_name::<T>(),
        })
}

/// Registered modules, in registration order.
#[derive(Default)]
pub struct ModuleDirectory {
    entries: RwLock<Vec<Arc<ModuleEntry>>>,
}

impl std::fmt::Debug for ModuleDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDirectory")
            .field("modules", &self.module_names())
            .finish()
    }
}

impl ModuleDirectory {
    pub(crate) fn insert(&self, entry: ModuleEntry) -> Result<Arc<ModuleEntry>, CoreError> {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.name == entry.name) {
            return Err(CoreError::ModuleAlreadyRegistered(entry.name.to_string()));
        }
        let entry = Arc::new(entry);
        entries.push(entry.clone());
        Ok(entry)
    }

    /// Snapshot of the table; safe to hold across `.await`.
    pub fn entries(&self) -> Vec<Arc<ModuleEntry>> {
        self.entries.read().clone()
    }

    fn entry(&self, name: &str) -> Result<Arc<ModuleEntry>, CoreError> {
        self.entries
            .read()
            .iter()
            .find(|e| e.name == name)
            .cloned()
            .ok_or_else(|| CoreError::ModuleNotFound(name.to_string()))
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.entries.read().iter().any(|e| e.name == name)
    }

    pub fn module_names(&self) -> Vec<&'static str> {
        self.entries.read().iter().map(|e| e.name).collect()
    }

    pub fn module_state(&self, name: &str) -> Option<ModuleState> {
        self.entry(name).ok().map(|e| e.state())
    }

    pub fn get_module(&self, name: &str) -> Result<Arc<dyn Module>, CoreError> {
        Ok(self.entry(name)?.core.clone())
    }

    pub fn get_module_as<T: Module>(&self, name: &str) -> Result<Arc<T>, CoreError> {
        downcast(name, self.get_module(name)?)
    }

    /// Resolve the single module providing `capability`.
    ///
    /// Zero providers is `CapabilityNotFound`, several is `AmbiguousCapability`;
    /// the first match is never picked silently.
    pub fn get_module_by_capability(&self, capability: &str) -> Result<Arc<dyn Module>, CoreError> {
        let entries = self.entries.read();
        let matches: Vec<&Arc<ModuleEntry>> =
            entries.iter().filter(|e| e.has_capability(capability)).collect();

        match matches.as_slice() {
            [] => Err(CoreError::CapabilityNotFound(capability.to_string())),
            [only] => Ok(only.core.clone()),
            many => Err(CoreError::AmbiguousCapability {
                capability: capability.to_string(),
                modules: many.iter().map(|e| e.name.to_string()).collect(),
            }),
        }
    }

    pub fn get_module_by_capability_as<T: Module>(
        &self,
        capability: &str,
    ) -> Result<Arc<T>, CoreError> {
        let module = self.get_module_by_capability(capability)?;
        let name = module.name();
        downcast(name, module)
    }

    /// Module `name` as a [`NetworkModule`]; it must carry the `network`
    /// capability.
    pub fn get_network(&self, name: &str) -> Result<Arc<dyn NetworkModule>, CoreError> {
        let entry = self.entry(name)?;
        if !entry.has_capability(capability::NETWORK) {
            return Err(missing_network(name));
        }
        entry.core.clone().as_network().ok_or_else(|| missing_network(name))
    }

    /// The single module providing the `network` capability.
    pub fn find_network(&self) -> Result<Arc<dyn NetworkModule>, CoreError> {
        let module = self.get_module_by_capability(capability::NETWORK)?;
        let name = module.name();
        module.as_network().ok_or_else(|| missing_network(name))
    }
}

// A module tagged `network` that does not hand out a `NetworkModule` is
// treated as lacking the capability.
fn missing_network(name: &str) -> CoreError {
    CoreError::MissingCapability {
        module: name.to_string(),
        capability: capability::NETWORK.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Statically submitted module factory, collected by [`Core::register_discovered`].
///
/// Use [`crate::submit_module!`] rather than building one by hand.
pub struct Registrator {
    pub name: &'static str,
    pub deps: &'static [&'static str],
    pub register: fn(&Core) -> Result<(), CoreError>,
}

impl std::fmt::Debug for Registrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrator")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .finish()
    }
}

inventory::collect!(Registrator);

/// Submit a module for discovery.
///
/// ```rust,ignore
/// chainkit::submit_module!(
///     name = "server",
///     deps = ["evm"],
///     factory = BackendServer::create,
/// );
/// ```
///
/// `factory` is a `fn(&Core) -> Arc<M>`.
#[macro_export]
macro_rules! submit_module {
    (name = $name:expr, deps = [$($dep:expr),* $(,)?], factory = $factory:path $(,)?) => {
        $crate::inventory::submit! {
            $crate::registry::Registrator {
                name: $name,
                deps: &[$($dep),*],
                register: |core: &$crate::Core| core.register_module($factory(core)),
            }
        }
    };
}

pub(crate) fn discovered() -> Vec<&'static Registrator> {
    inventory::iter::<Registrator>.into_iter().collect()
}

/// Detect cycles in the dependency graph using DFS with path tracking.
fn detect_cycle_with_path(names: &[&'static str], adj: &[Vec<usize>]) -> Option<Vec<&'static str>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    fn visit(
        node: usize,
        names: &[&'static str],
        adj: &[Vec<usize>],
        marks: &mut [Mark],
        path: &mut Vec<usize>,
    ) -> Option<Vec<&'static str>> {
        marks[node] = Mark::OnPath;
        path.push(node);

        for &next in &adj[node] {
            match marks[next] {
                Mark::OnPath => {
                    let start = path.iter().position(|&n| n == next)?;
                    let mut cycle: Vec<&'static str> = path[start..].iter().map(|&i| names[i]).collect();
                    cycle.push(names[next]);
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    if let Some(cycle) = visit(next, names, adj, marks, path) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }

        path.pop();
        marks[node] = Mark::Done;
        None
    }

    let mut marks = vec![Mark::Unvisited; names.len()];
    let mut path = Vec::new();
    for i in 0..names.len() {
        if marks[i] == Mark::Unvisited {
            if let Some(cycle) = visit(i, names, adj, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

/// Order registrators so that dependencies come first; independent modules
/// are ordered by name.
///
/// `is_known` reports modules already registered on the core, which satisfy
/// dependencies without being part of `regs`.
pub(crate) fn resolve_order<'a>(
    regs: &[&'a Registrator],
    is_known: impl Fn(&str) -> bool,
) -> Result<Vec<&'a Registrator>, CoreError> {
    let mut idx: HashMap<&'static str, usize> = HashMap::new();
    for (i, r) in regs.iter().enumerate() {
        if idx.insert(r.name, i).is_some() {
            return Err(CoreError::ModuleAlreadyRegistered(r.name.to_string()));
        }
    }
    let names: Vec<&'static str> = regs.iter().map(|r| r.name).collect();

    // edge dep -> module
    let mut adj = vec![Vec::<usize>::new(); regs.len()];
    for (u, r) in regs.iter().enumerate() {
        for &dep in r.deps {
            match idx.get(dep) {
                Some(&v) => adj[v].push(u),
                None if is_known(dep) => {}
                None => {
                    return Err(CoreError::UnknownDependency {
                        module: r.name.to_string(),
                        depends_on: dep.to_string(),
                    })
                }
            }
        }
    }

    if let Some(path) = detect_cycle_with_path(&names, &adj) {
        return Err(CoreError::CycleDetected { path });
    }

    // Kahn's algorithm; the ready set is ordered by name for a stable result.
    let mut indeg = vec![0usize; regs.len()];
    for targets in &adj {
        for &t in targets {
            indeg[t] += 1;
        }
    }
    let mut ready: BTreeSet<(&'static str, usize)> = indeg
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(i, _)| (names[i], i))
        .collect();

    let mut order = Vec::with_capacity(regs.len());
    while let Some((_, u)) = ready.pop_first() {
        order.push(regs[u]);
        for &w in &adj[u] {
            indeg[w] -= 1;
            if indeg[w] == 0 {
                ready.insert((names[w], w));
            }
        }
    }

    tracing::debug!(
        modules = ?order.iter().map(|r| r.name).collect::<Vec<_>>(),
        "Discovered module order resolved"
    );
    Ok(order)
}
