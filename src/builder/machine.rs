//! Builder for constructing machines.

use crate::builder::error::BuildError;
use crate::builder::transition::{TransitionBuilder, TransitionDef};
use crate::config::MachineConfig;
use crate::core::{Action, Event};
use crate::machine::{
    Machine, StateId, StateKind, StateNode, StepTrace, TraceHook, Transition, ROOT_ID,
};
use std::collections::{HashMap, HashSet};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::debug;

/// Parent key of top-level states.
pub const ROOT: &str = "<root>";

type Check = Validation<(), NonEmptyVec<BuildError>>;

fn fail(error: BuildError) -> Check {
    Validation::fail(error)
}

fn pass() -> Check {
    Validation::success(())
}

enum Declared {
    Leaf,
    Composite { default_child: String },
    Parallel { regions: Vec<String> },
}

struct StateDecl {
    key: String,
    parent: String,
    declared: Declared,
}

/// Builder for constructing machines with a fluent API.
///
/// States are declared by key with the key of their parent; top-level
/// states use [`ROOT`]. Nothing is checked until [`build`](Self::build),
/// which validates the whole definition and reports every problem at once.
///
/// # Example
///
/// ```rust
/// use statechart::builder::{event_transition, MachineBuilder};
/// use statechart::ROOT;
///
/// let mut machine = MachineBuilder::<(), &'static str>::new()
///     .parallel("Crossing", ROOT, ["Light", "Pedestrian"])
///     .composite("Light", "Crossing", "Red")
///     .leaf("Red", "Light")
///     .leaf("Green", "Light")
///     .composite("Pedestrian", "Crossing", "Walk")
///     .leaf("Walk", "Pedestrian")
///     .leaf("DontWalk", "Pedestrian")
///     .add_transition(event_transition("Red", "Tick", "Green"))
///     .add_transition(event_transition("Walk", "Tick", "DontWalk"))
///     .build(())
///     .unwrap();
///
/// machine.start().unwrap();
/// assert_eq!(machine.active_leaves(), vec!["Red", "Walk"]);
///
/// machine.apply_event(Some(&"Tick")).unwrap();
/// assert_eq!(machine.active_leaves(), vec!["Green", "DontWalk"]);
/// ```
pub struct MachineBuilder<C, E: Event> {
    states: Vec<StateDecl>,
    initial: Option<String>,
    marked_defaults: Vec<String>,
    entry_actions: Vec<(String, Action<C, E>)>,
    exit_actions: Vec<(String, Action<C, E>)>,
    transitions: Vec<TransitionDef<C, E>>,
    config: MachineConfig,
    trace: Option<TraceHook<E>>,
}

impl<C, E: Event> MachineBuilder<C, E> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            initial: None,
            marked_defaults: Vec::new(),
            entry_actions: Vec::new(),
            exit_actions: Vec::new(),
            transitions: Vec::new(),
            config: MachineConfig::default(),
            trace: None,
        }
    }

    /// Declare a composite state and its default child.
    pub fn composite(
        mut self,
        key: impl Into<String>,
        parent: impl Into<String>,
        default_child: impl Into<String>,
    ) -> Self {
        self.states.push(StateDecl {
            key: key.into(),
            parent: parent.into(),
            declared: Declared::Composite {
                default_child: default_child.into(),
            },
        });
        self
    }

    /// Declare a parallel state. Every region must be declared as a
    /// composite whose parent is this state.
    pub fn parallel<I>(mut self, key: impl Into<String>, parent: impl Into<String>, regions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.states.push(StateDecl {
            key: key.into(),
            parent: parent.into(),
            declared: Declared::Parallel {
                regions: regions.into_iter().map(Into::into).collect(),
            },
        });
        self
    }

    /// Declare a leaf state.
    pub fn leaf(mut self, key: impl Into<String>, parent: impl Into<String>) -> Self {
        self.states.push(StateDecl {
            key: key.into(),
            parent: parent.into(),
            declared: Declared::Leaf,
        });
        self
    }

    /// Set the default child of the implicit root.
    ///
    /// May be omitted when there is exactly one top-level state.
    pub fn initial(mut self, key: impl Into<String>) -> Self {
        self.initial = Some(key.into());
        self
    }

    /// Mark a state as the default child of its parent.
    ///
    /// Marking a second, different default in the same composite is a
    /// build error.
    pub fn mark_default(mut self, key: impl Into<String>) -> Self {
        self.marked_defaults.push(key.into());
        self
    }

    /// Set the entry action of a state, replacing any earlier one.
    pub fn on_entry(mut self, key: impl Into<String>, action: Action<C, E>) -> Self {
        self.entry_actions.push((key.into(), action));
        self
    }

    /// Set the exit action of a state, replacing any earlier one.
    pub fn on_exit(mut self, key: impl Into<String>, action: Action<C, E>) -> Self {
        self.exit_actions.push((key.into(), action));
        self
    }

    /// Add a transition using a builder.
    /// Returns an error if the builder fails validation.
    pub fn transition(mut self, builder: TransitionBuilder<C, E>) -> Result<Self, BuildError> {
        let transition = builder.build()?;
        self.transitions.push(transition);
        Ok(self)
    }

    /// Add a pre-built transition.
    pub fn add_transition(mut self, transition: TransitionDef<C, E>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Add multiple transitions at once.
    pub fn transitions(mut self, transitions: Vec<TransitionDef<C, E>>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_transitions_per_step(mut self, max: usize) -> Self {
        self.config.max_transitions_per_step = max;
        self
    }

    /// Observe every pass that changes the configuration.
    pub fn trace<F>(mut self, hook: F) -> Self
    where
        F: Fn(&StepTrace<'_, E>) + Send + Sync + 'static,
    {
        self.trace = Some(Box::new(hook));
        self
    }

    /// Validate the definition and build the machine around `context`.
    ///
    /// The machine is not started; call [`Machine::start`] or apply an
    /// event to enter the initial configuration.
    pub fn build(self, context: C) -> Result<Machine<C, E>, BuildError> {
        let mut checks: Vec<Check> = Vec::new();
        checks.push(match self.config.validate() {
            Ok(()) => pass(),
            Err(err) => fail(BuildError::InvalidConfig(err.to_string())),
        });

        let registry = self.register(&mut checks);
        let parents = self.resolve_parents(&registry, &mut checks);
        let children = children_of(&parents);
        let ancestors = self.resolve_ancestors(&parents, &mut checks);
        let kinds = self.resolve_kinds(&registry, &parents, &children, &mut checks);

        let mut transitions: Vec<(StateId, Transition<C, E>)> = Vec::new();
        for def in self.transitions {
            let Some(&source) = registry.get(&def.from) else {
                checks.push(fail(BuildError::UnknownState { key: def.from }));
                continue;
            };
            let target = match &def.to {
                Some(to) => match registry.get(to) {
                    Some(&target) => Some(target),
                    None => {
                        checks.push(fail(BuildError::UnresolvedTarget {
                            from: def.from.clone(),
                            to: to.clone(),
                        }));
                        continue;
                    }
                },
                None => None,
            };
            transitions.push((
                source,
                Transition {
                    trigger: def.trigger,
                    guard: def.guard,
                    action: def.action,
                    target,
                    history: def.history,
                },
            ));
        }

        let entry_actions = resolve_actions(self.entry_actions, &registry, &mut checks);
        let exit_actions = resolve_actions(self.exit_actions, &registry, &mut checks);

        if let Validation::Failure(errors) = Validation::all_vec(checks) {
            return Err(collapse(errors.iter().cloned().collect()));
        }

        let keys = std::iter::once(ROOT.to_string()).chain(self.states.into_iter().map(|decl| decl.key));
        let mut nodes: Vec<StateNode<C, E>> = keys
            .zip(kinds)
            .zip(parents.iter().copied().zip(ancestors))
            .map(|((key, kind), (parent, ancestors))| {
                let mut node = StateNode::new(key, parent, kind);
                node.ancestors = ancestors;
                node
            })
            .collect();

        let transition_count = transitions.len();
        for (source, transition) in transitions {
            nodes[source.0].transitions.push(transition);
        }
        for (id, action) in entry_actions {
            nodes[id.0].on_entry = Some(action);
        }
        for (id, action) in exit_actions {
            nodes[id.0].on_exit = Some(action);
        }

        let machine = Machine::from_parts(nodes, registry, context, self.config, self.trace);
        debug!(
            machine = %machine.instance_id(),
            states = machine.state_count(),
            transitions = transition_count,
            "machine built"
        );
        Ok(machine)
    }

    /// Key → id for every declared state. Slot zero is the root; the n-th
    /// declaration gets slot n + 1.
    fn register(&self, checks: &mut Vec<Check>) -> HashMap<String, StateId> {
        let mut registry = HashMap::new();
        for (index, decl) in self.states.iter().enumerate() {
            if decl.key == ROOT || registry.contains_key(&decl.key) {
                checks.push(fail(BuildError::DuplicateState {
                    key: decl.key.clone(),
                }));
                continue;
            }
            registry.insert(decl.key.clone(), StateId(index + 1));
        }
        registry
    }

    fn resolve_parents(
        &self,
        registry: &HashMap<String, StateId>,
        checks: &mut Vec<Check>,
    ) -> Vec<Option<StateId>> {
        let mut parents = vec![None];
        for (index, decl) in self.states.iter().enumerate() {
            let is_registered = registry.get(&decl.key) == Some(&StateId(index + 1));
            let parent = if decl.parent == ROOT {
                Some(ROOT_ID)
            } else {
                registry.get(&decl.parent).copied()
            };

            match parent {
                None => checks.push(fail(BuildError::UnknownParent {
                    state: decl.key.clone(),
                    parent: decl.parent.clone(),
                })),
                Some(id) if id != ROOT_ID && matches!(self.states[id.0 - 1].declared, Declared::Leaf) => {
                    checks.push(fail(BuildError::ParentIsLeaf {
                        state: decl.key.clone(),
                        parent: decl.parent.clone(),
                    }))
                }
                Some(_) => {}
            }

            // Duplicates stay out of the tree; they already failed the build.
            parents.push(parent.filter(|_| is_registered));
        }
        parents
    }

    fn resolve_ancestors(
        &self,
        parents: &[Option<StateId>],
        checks: &mut Vec<Check>,
    ) -> Vec<Vec<StateId>> {
        (0..parents.len())
            .map(|index| {
                let mut chain = Vec::new();
                let mut current = parents[index];
                while let Some(parent) = current {
                    if chain.len() >= parents.len() {
                        checks.push(fail(BuildError::ParentCycle {
                            state: self.states[index - 1].key.clone(),
                        }));
                        return Vec::new();
                    }
                    chain.push(parent);
                    current = parents[parent.0];
                }
                chain.reverse();
                chain
            })
            .collect()
    }

    fn resolve_kinds(
        &self,
        registry: &HashMap<String, StateId>,
        parents: &[Option<StateId>],
        children: &[Vec<StateId>],
        checks: &mut Vec<Check>,
    ) -> Vec<StateKind> {
        let mut marked: HashMap<StateId, Vec<String>> = HashMap::new();
        for key in &self.marked_defaults {
            match registry.get(key) {
                Some(id) => {
                    if let Some(parent) = parents[id.0] {
                        marked.entry(parent).or_default().push(key.clone());
                    }
                }
                None => checks.push(fail(BuildError::UnknownState { key: key.clone() })),
            }
        }

        let mut root_candidates: Vec<String> = self.initial.iter().cloned().collect();
        root_candidates.extend(marked.remove(&ROOT_ID).unwrap_or_default());
        if root_candidates.is_empty() && children[ROOT_ID.0].len() == 1 {
            root_candidates.push(self.key(children[ROOT_ID.0][0]).to_string());
        }

        let mut kinds = Vec::with_capacity(parents.len());
        kinds.push(self.composite_kind(ROOT, ROOT_ID, root_candidates, registry, parents, children, checks));

        for (index, decl) in self.states.iter().enumerate() {
            let id = StateId(index + 1);
            let kind = match &decl.declared {
                Declared::Leaf => StateKind::Leaf,
                Declared::Composite { default_child } => {
                    let mut candidates = vec![default_child.clone()];
                    candidates.extend(marked.remove(&id).unwrap_or_default());
                    self.composite_kind(&decl.key, id, candidates, registry, parents, children, checks)
                }
                Declared::Parallel { regions } => {
                    if let Some(keys) = marked.remove(&id) {
                        for child in keys {
                            checks.push(fail(BuildError::DefaultNotChild {
                                composite: decl.key.clone(),
                                child,
                            }));
                        }
                    }
                    self.parallel_kind(&decl.key, id, regions, registry, parents, children, checks)
                }
            };
            kinds.push(kind);
        }

        // Marks left over belong to leaves, which have no children at all.
        for (parent, keys) in marked {
            for child in keys {
                checks.push(fail(BuildError::DefaultNotChild {
                    composite: self.key(parent).to_string(),
                    child,
                }));
            }
        }

        kinds
    }

    #[allow(clippy::too_many_arguments)]
    fn composite_kind(
        &self,
        key: &str,
        id: StateId,
        candidates: Vec<String>,
        registry: &HashMap<String, StateId>,
        parents: &[Option<StateId>],
        children: &[Vec<StateId>],
        checks: &mut Vec<Check>,
    ) -> StateKind {
        if children[id.0].is_empty() {
            checks.push(fail(BuildError::EmptyComposite {
                composite: key.to_string(),
            }));
            return StateKind::Leaf;
        }

        let mut distinct: Vec<String> = Vec::new();
        for candidate in candidates {
            if !distinct.contains(&candidate) {
                distinct.push(candidate);
            }
        }

        match distinct.as_slice() {
            [] => {
                checks.push(fail(BuildError::MissingDefault {
                    composite: key.to_string(),
                }));
                StateKind::Leaf
            }
            [only] => match registry.get(only) {
                Some(&child) if parents[child.0] == Some(id) => StateKind::Composite {
                    children: children[id.0].clone(),
                    default_child: child,
                    active_child: None,
                },
                _ => {
                    checks.push(fail(BuildError::DefaultNotChild {
                        composite: key.to_string(),
                        child: only.clone(),
                    }));
                    StateKind::Leaf
                }
            },
            _ => {
                checks.push(fail(BuildError::MultipleDefaults {
                    composite: key.to_string(),
                    candidates: distinct,
                }));
                StateKind::Leaf
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn parallel_kind(
        &self,
        key: &str,
        id: StateId,
        regions: &[String],
        registry: &HashMap<String, StateId>,
        parents: &[Option<StateId>],
        children: &[Vec<StateId>],
        checks: &mut Vec<Check>,
    ) -> StateKind {
        if regions.is_empty() && children[id.0].is_empty() {
            checks.push(fail(BuildError::EmptyParallel {
                parallel: key.to_string(),
            }));
            return StateKind::Leaf;
        }

        let mismatch = |region: &str| {
            fail(BuildError::RegionMismatch {
                parallel: key.to_string(),
                region: region.to_string(),
            })
        };

        let mut resolved = Vec::with_capacity(regions.len());
        let mut seen = HashSet::new();
        for region in regions {
            match registry.get(region) {
                Some(&child) if parents[child.0] == Some(id) && seen.insert(child) => {
                    if !matches!(self.states[child.0 - 1].declared, Declared::Composite { .. }) {
                        checks.push(fail(BuildError::RegionNotComposite {
                            parallel: key.to_string(),
                            region: region.clone(),
                        }));
                    }
                    resolved.push(child);
                }
                _ => checks.push(mismatch(region)),
            }
        }
        for child in &children[id.0] {
            if !seen.contains(child) {
                checks.push(mismatch(self.key(*child)));
            }
        }

        StateKind::Parallel { regions: resolved }
    }

    fn key(&self, id: StateId) -> &str {
        if id == ROOT_ID {
            ROOT
        } else {
            &self.states[id.0 - 1].key
        }
    }
}

impl<C, E: Event> Default for MachineBuilder<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Children of every node, in declaration order.
fn children_of(parents: &[Option<StateId>]) -> Vec<Vec<StateId>> {
    let mut children = vec![Vec::new(); parents.len()];
    for (index, parent) in parents.iter().enumerate() {
        if let Some(parent) = parent {
            children[parent.0].push(StateId(index));
        }
    }
    children
}

fn resolve_actions<C, E: Event>(
    actions: Vec<(String, Action<C, E>)>,
    registry: &HashMap<String, StateId>,
    checks: &mut Vec<Check>,
) -> Vec<(StateId, Action<C, E>)> {
    let mut resolved = Vec::with_capacity(actions.len());
    for (key, action) in actions {
        match registry.get(&key) {
            Some(&id) => resolved.push((id, action)),
            None => checks.push(fail(BuildError::UnknownState { key })),
        }
    }
    resolved
}

fn collapse(mut errors: Vec<BuildError>) -> BuildError {
    match errors.len() {
        1 => errors.remove(0),
        _ => BuildError::Multiple(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::event_transition;

    type Builder = MachineBuilder<(), &'static str>;

    fn traffic_light() -> Builder {
        Builder::new()
            .composite("Light", ROOT, "Red")
            .leaf("Red", "Light")
            .leaf("Green", "Light")
            .leaf("Yellow", "Light")
    }

    fn problems(err: &BuildError) -> Vec<BuildError> {
        err.problems().into_iter().cloned().collect()
    }

    #[test]
    fn fluent_api_builds_machine() {
        let machine = traffic_light()
            .add_transition(event_transition("Red", "Tick", "Green"))
            .add_transition(event_transition("Green", "Tick", "Yellow"))
            .add_transition(event_transition("Yellow", "Tick", "Red"))
            .build(())
            .unwrap();

        assert_eq!(machine.state_count(), 4);
        assert!(!machine.is_started());
        assert!(machine.lookup("Yellow").is_ok());
        assert!(machine.lookup(ROOT).is_err());
    }

    #[test]
    fn single_top_level_state_is_root_default() {
        let mut machine = traffic_light().build(()).unwrap();
        machine.start().unwrap();
        assert_eq!(machine.active_configuration(), vec!["Light", "Red"]);
    }

    #[test]
    fn root_needs_a_default_with_several_top_level_states() {
        let err = Builder::new()
            .leaf("On", ROOT)
            .leaf("Off", ROOT)
            .build(())
            .unwrap_err();

        assert_eq!(
            err,
            BuildError::MissingDefault {
                composite: ROOT.to_string()
            }
        );

        let machine = Builder::new()
            .leaf("On", ROOT)
            .leaf("Off", ROOT)
            .initial("Off")
            .build(());
        assert!(machine.is_ok());
    }

    #[test]
    fn mark_default_selects_default_child() {
        let mut machine = Builder::new()
            .leaf("On", ROOT)
            .leaf("Off", ROOT)
            .mark_default("On")
            .build(())
            .unwrap();

        machine.start().unwrap();
        assert!(machine.is_in_state("On").unwrap());
    }

    #[test]
    fn second_default_is_rejected() {
        let err = traffic_light().mark_default("Green").build(()).unwrap_err();

        assert_eq!(
            err,
            BuildError::MultipleDefaults {
                composite: "Light".to_string(),
                candidates: vec!["Red".to_string(), "Green".to_string()],
            }
        );
    }

    #[test]
    fn marking_the_declared_default_again_is_allowed() {
        assert!(traffic_light().mark_default("Red").build(()).is_ok());
    }

    #[test]
    fn default_must_be_a_child() {
        let err = Builder::new()
            .composite("Light", ROOT, "Blue")
            .leaf("Red", "Light")
            .build(())
            .unwrap_err();

        assert_eq!(
            err,
            BuildError::DefaultNotChild {
                composite: "Light".to_string(),
                child: "Blue".to_string(),
            }
        );
    }

    #[test]
    fn composite_without_children_is_rejected() {
        let err = Builder::new()
            .composite("Light", ROOT, "Red")
            .build(())
            .unwrap_err();

        assert_eq!(
            err,
            BuildError::EmptyComposite {
                composite: "Light".to_string()
            }
        );
    }

    #[test]
    fn unresolved_target_is_rejected() {
        let err = traffic_light()
            .add_transition(event_transition("Red", "Tick", "Blue"))
            .build(())
            .unwrap_err();

        assert_eq!(
            err,
            BuildError::UnresolvedTarget {
                from: "Red".to_string(),
                to: "Blue".to_string(),
            }
        );
    }

    #[test]
    fn unknown_source_and_action_states_are_rejected() {
        let err = traffic_light()
            .add_transition(event_transition("Blue", "Tick", "Red"))
            .on_entry("Purple", Action::new(|_, _| {}))
            .build(())
            .unwrap_err();

        let found = problems(&err);
        assert!(found.contains(&BuildError::UnknownState {
            key: "Blue".to_string()
        }));
        assert!(found.contains(&BuildError::UnknownState {
            key: "Purple".to_string()
        }));
    }

    #[test]
    fn build_accumulates_all_problems() {
        let err = traffic_light()
            .leaf("Red", "Light")
            .leaf("Orphan", "Nowhere")
            .leaf("Nested", "Green")
            .add_transition(event_transition("Red", "Tick", "Blue"))
            .build(())
            .unwrap_err();

        assert!(matches!(err, BuildError::Multiple(_)));
        let found = problems(&err);
        assert_eq!(found.len(), 4);
        assert!(found.contains(&BuildError::DuplicateState {
            key: "Red".to_string()
        }));
        assert!(found.contains(&BuildError::UnknownParent {
            state: "Orphan".to_string(),
            parent: "Nowhere".to_string(),
        }));
        assert!(found.contains(&BuildError::ParentIsLeaf {
            state: "Nested".to_string(),
            parent: "Green".to_string(),
        }));
    }

    #[test]
    fn root_key_cannot_be_declared() {
        let err = traffic_light().leaf(ROOT, "Light").build(()).unwrap_err();
        assert_eq!(
            err,
            BuildError::DuplicateState {
                key: ROOT.to_string()
            }
        );
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let err = traffic_light()
            .composite("A", "B", "B")
            .composite("B", "A", "A")
            .build(())
            .unwrap_err();

        assert!(problems(&err)
            .iter()
            .any(|problem| matches!(problem, BuildError::ParentCycle { .. })));
    }

    #[test]
    fn parallel_regions_must_match_children() {
        let err = Builder::new()
            .parallel("Crossing", ROOT, ["Light", "Pedestrian"])
            .composite("Light", "Crossing", "Red")
            .leaf("Red", "Light")
            .leaf("Pedestrian", "Crossing")
            .leaf("Horn", "Crossing")
            .build(())
            .unwrap_err();

        let found = problems(&err);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&BuildError::RegionNotComposite {
            parallel: "Crossing".to_string(),
            region: "Pedestrian".to_string(),
        }));
        assert!(found.contains(&BuildError::RegionMismatch {
            parallel: "Crossing".to_string(),
            region: "Horn".to_string(),
        }));
    }

    #[test]
    fn parallel_without_regions_is_rejected() {
        let err = Builder::new()
            .parallel("Crossing", ROOT, Vec::<String>::new())
            .build(())
            .unwrap_err();

        assert_eq!(
            err,
            BuildError::EmptyParallel {
                parallel: "Crossing".to_string()
            }
        );
    }

    #[test]
    fn zero_transition_bound_is_rejected() {
        let err = traffic_light()
            .max_transitions_per_step(0)
            .build(())
            .unwrap_err();

        assert!(matches!(err, BuildError::InvalidConfig(_)));
    }

    #[test]
    fn transition_builder_errors_surface_immediately() {
        let result = traffic_light().transition(TransitionBuilder::new().to("Green"));
        assert!(matches!(result, Err(BuildError::MissingFromState)));
    }
}
