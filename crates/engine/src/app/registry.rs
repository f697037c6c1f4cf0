use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use super::collision::Aabb;
use super::context::{Commands, PendingSpawn, TickContext, TickEnv};
use super::entity::{Behavior, Entity, EntityId, EntityKind, EntityTemplate};
use super::rendering::DrawList;

struct Slot {
    entity: Entity,
    behavior: Box<dyn Behavior>,
}

/// Entities that were live when a tick's dispatch began, plus read-only copies
/// of every registered entity for id lookups.
#[derive(Debug, Clone, Default)]
pub struct DispatchSnapshot {
    ids: Vec<EntityId>,
    roster: Vec<Entity>,
}

impl DispatchSnapshot {
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Runs one behavior hook, containing any panic it raises. Returns `false`
/// when the hook panicked.
fn run_hook(id: EntityId, kind: EntityKind, hook: &'static str, run: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(run)) {
        Ok(()) => true,
        Err(payload) => {
            warn!(
                entity = id.0,
                kind = kind.0,
                hook,
                message = panic_message(&*payload),
                "behavior_panicked"
            );
            false
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub spawned: usize,
}

/// Sole owner of entity membership. Ids are handed out in increasing order and
/// iteration always follows id order.
#[derive(Default)]
pub struct EntityRegistry {
    slots: BTreeMap<EntityId, Slot>,
    commands: Commands,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity right away. A dispatch snapshot taken earlier does not
    /// include it.
    pub fn insert(
        &mut self,
        template: EntityTemplate,
        behavior: impl Behavior + 'static,
    ) -> EntityId {
        let id = self.commands.allocate();
        self.slots.insert(
            id,
            Slot {
                entity: template.into_entity(id),
                behavior: Box::new(behavior),
            },
        );
        id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(&id).map(|slot| &slot.entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.slots.values().map(|slot| &slot.entity)
    }

    /// Registry-level force removal: flags the entity so the next sweep
    /// removes it. Returns `false` for unknown or already destroyed ids.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        match self.slots.get_mut(&id) {
            Some(slot) => slot.entity.destroy(),
            None => {
                debug!(entity = id.0, "destroy_unknown_entity");
                false
            }
        }
    }

    pub fn snapshot_for_dispatch(&self) -> DispatchSnapshot {
        let ids = self
            .slots
            .values()
            .filter(|slot| !slot.entity.is_destroyed())
            .map(|slot| slot.entity.id())
            .collect();
        let roster = self.slots.values().map(|slot| slot.entity.clone()).collect();
        DispatchSnapshot { ids, roster }
    }

    /// Removes every destroyed entity, running its destruction hook first.
    /// Entities spawned by those hooks are registered afterwards and are not
    /// swept by this call. A panicking hook does not keep its entity alive.
    pub(crate) fn sweep(&mut self, env: &mut TickEnv) -> SweepReport {
        let doomed: Vec<EntityId> = self
            .slots
            .values()
            .filter(|slot| slot.entity.is_destroyed())
            .map(|slot| slot.entity.id())
            .collect();
        if doomed.is_empty() {
            return SweepReport::default();
        }

        let roster: Vec<Entity> = self.slots.values().map(|slot| slot.entity.clone()).collect();
        let Self { slots, commands } = self;
        for id in &doomed {
            if let Some(slot) = slots.get_mut(id) {
                let mut ctx = TickContext::new(env, commands, &roster);
                let Slot { entity, behavior } = slot;
                run_hook(*id, entity.kind, "on_destroyed", || {
                    behavior.on_destroyed(entity, &mut ctx)
                });
            }
            slots.remove(id);
        }

        let spawned = self.apply_commands();
        debug!(removed = doomed.len(), spawned, "sweep_complete");
        SweepReport {
            removed: doomed.len(),
            spawned,
        }
    }

    /// Applies queued destroy requests, then registers queued spawns.
    /// Returns the number of entities registered.
    pub(crate) fn apply_commands(&mut self) -> usize {
        if self.commands.is_empty() {
            return 0;
        }

        let requests = std::mem::take(&mut self.commands.destroy_requests);
        for id in requests {
            self.destroy(id);
        }

        let spawns = std::mem::take(&mut self.commands.spawns);
        let spawned = spawns.len();
        for PendingSpawn { entity, behavior } in spawns {
            let id = entity.id();
            if self.slots.contains_key(&id) {
                warn!(entity = id.0, "spawn_id_collision");
                continue;
            }
            self.slots.insert(id, Slot { entity, behavior });
        }
        spawned
    }

    /// Runs `hook` for every snapshot entity that is still registered and not
    /// destroyed, in snapshot order. Returns how many entities were visited.
    /// An entity whose hook panics is flagged destroyed and the walk goes on.
    pub(crate) fn dispatch_each<F>(
        &mut self,
        snapshot: &DispatchSnapshot,
        env: &mut TickEnv,
        hook_name: &'static str,
        mut hook: F,
    ) -> usize
    where
        F: FnMut(&mut Entity, &mut dyn Behavior, &mut TickContext<'_>),
    {
        let Self { slots, commands } = self;
        let mut visited = 0;
        for id in &snapshot.ids {
            let Some(slot) = slots.get_mut(id) else {
                continue;
            };
            if slot.entity.is_destroyed() {
                continue;
            }
            let mut ctx = TickContext::new(env, commands, &snapshot.roster);
            let kind = slot.entity.kind;
            let Slot { entity, behavior } = slot;
            if !run_hook(*id, kind, hook_name, || {
                hook(entity, behavior.as_mut(), &mut ctx)
            }) {
                entity.destroy();
            }
            visited += 1;
        }
        visited
    }

    /// Gives setup code a context outside of any tick, e.g. to load a scene.
    pub(crate) fn with_context<R>(
        &mut self,
        env: &mut TickEnv,
        run: impl FnOnce(&mut TickContext<'_>) -> R,
    ) -> R {
        let roster: Vec<Entity> = self.slots.values().map(|slot| slot.entity.clone()).collect();
        let mut ctx = TickContext::new(env, &mut self.commands, &roster);
        run(&mut ctx)
    }

    pub(crate) fn collect_solid_bounds(
        &self,
        snapshot: &DispatchSnapshot,
        out: &mut Vec<(EntityId, Aabb)>,
    ) {
        out.clear();
        for id in &snapshot.ids {
            let Some(slot) = self.slots.get(id) else {
                continue;
            };
            if !slot.entity.is_solid() {
                continue;
            }
            if let Some(bounds) = slot.entity.bounds() {
                out.push((*id, bounds));
            }
        }
    }

    /// Delivers one collision to each side of the pair. Each side sees the
    /// other as it was just before the pair was processed.
    pub(crate) fn notify_collision(
        &mut self,
        first: EntityId,
        second: EntityId,
        snapshot: &DispatchSnapshot,
        env: &mut TickEnv,
    ) -> bool {
        let (Some(first_view), Some(second_view)) = (
            self.slots.get(&first).map(|slot| slot.entity.clone()),
            self.slots.get(&second).map(|slot| slot.entity.clone()),
        ) else {
            return false;
        };
        if first_view.is_destroyed() || second_view.is_destroyed() {
            return false;
        }

        let Self { slots, commands } = self;
        for (id, other) in [(first, &second_view), (second, &first_view)] {
            if let Some(slot) = slots.get_mut(&id) {
                let mut ctx = TickContext::new(env, commands, &snapshot.roster);
                let kind = slot.entity.kind;
                let Slot { entity, behavior } = slot;
                if !run_hook(id, kind, "on_collision", || {
                    behavior.on_collision(entity, other, &mut ctx)
                }) {
                    entity.destroy();
                }
            }
        }
        true
    }

    /// Asks every live entity for draw commands, lowest depth first, ties in
    /// id order. Does not mutate anything.
    pub fn render(&self, draw: &mut DrawList) {
        let mut ordered: Vec<&Slot> = self
            .slots
            .values()
            .filter(|slot| !slot.entity.is_destroyed())
            .collect();
        ordered.sort_by_key(|slot| (slot.entity.depth, slot.entity.id()));
        for slot in ordered {
            slot.behavior.render(&slot.entity, draw);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::app::context::Canvas;
    use crate::app::entity::{EntityKind, Vec2};
    use crate::app::rendering::{Color, DrawCommand};

    const DUMMY: EntityKind = EntityKind("dummy");

    fn env() -> TickEnv {
        TickEnv::new(Canvas::default(), Some(1))
    }

    struct Inert;

    impl Behavior for Inert {}

    struct Marker {
        radius: f32,
    }

    impl Behavior for Marker {
        fn render(&self, entity: &Entity, draw: &mut DrawList) {
            draw.circle(entity.position, self.radius, Color::rgb(0, 0, 0));
        }
    }

    struct SpawnOnDeath {
        log: Rc<RefCell<Vec<EntityId>>>,
    }

    impl Behavior for SpawnOnDeath {
        fn on_destroyed(&mut self, entity: &Entity, ctx: &mut TickContext<'_>) {
            self.log.borrow_mut().push(entity.id());
            ctx.spawn(EntityTemplate::new(DUMMY, entity.position), Inert);
        }
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let mut registry = EntityRegistry::new();
        let first = registry.insert(EntityTemplate::new(DUMMY, Vec2::ZERO), Inert);
        let second = registry.insert(EntityTemplate::new(DUMMY, Vec2::ZERO), Inert);
        assert!(second > first);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn snapshot_excludes_later_inserts_and_destroyed_entities() {
        let mut registry = EntityRegistry::new();
        let kept = registry.insert(EntityTemplate::new(DUMMY, Vec2::ZERO), Inert);
        let doomed = registry.insert(EntityTemplate::new(DUMMY, Vec2::ZERO), Inert);
        assert!(registry.destroy(doomed));

        let snapshot = registry.snapshot_for_dispatch();
        let late = registry.insert(EntityTemplate::new(DUMMY, Vec2::ZERO), Inert);

        assert_eq!(snapshot.ids(), &[kept]);
        assert!(!snapshot.contains(late));
        assert!(!snapshot.contains(doomed));
    }

    #[test]
    fn dispatch_skips_entities_destroyed_mid_iteration() {
        let mut registry = EntityRegistry::new();
        let first = registry.insert(EntityTemplate::new(DUMMY, Vec2::ZERO), Inert);
        let second = registry.insert(EntityTemplate::new(DUMMY, Vec2::ZERO), Inert);
        let snapshot = registry.snapshot_for_dispatch();
        let mut env = env();

        let mut visited = Vec::new();
        registry.dispatch_each(&snapshot, &mut env, "step", |entity, _, _| {
            visited.push(entity.id());
            if entity.id() == first {
                entity.destroy();
            }
        });
        assert_eq!(visited, vec![first, second]);

        visited.clear();
        registry.dispatch_each(&snapshot, &mut env, "step", |entity, _, _| {
            visited.push(entity.id())
        });
        assert_eq!(visited, vec![second]);
    }

    #[test]
    fn sweep_is_noop_without_destroyed_entities() {
        let mut registry = EntityRegistry::new();
        registry.insert(EntityTemplate::new(DUMMY, Vec2::ZERO), Inert);
        let mut env = env();

        assert_eq!(registry.sweep(&mut env), SweepReport::default());
        assert_eq!(registry.sweep(&mut env), SweepReport::default());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn sweep_runs_hook_once_and_registers_hook_spawns() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = EntityRegistry::new();
        let doomed = registry.insert(
            EntityTemplate::new(DUMMY, Vec2::new(4.0, 5.0)),
            SpawnOnDeath { log: log.clone() },
        );
        registry.destroy(doomed);
        let mut env = env();

        let report = registry.sweep(&mut env);
        assert_eq!(report, SweepReport { removed: 1, spawned: 1 });
        assert!(!registry.contains(doomed));
        assert_eq!(registry.len(), 1);
        let survivor = registry.entities().next().expect("spawned entity");
        assert_eq!(survivor.position, Vec2::new(4.0, 5.0));
        assert!(!survivor.is_destroyed());

        assert_eq!(registry.sweep(&mut env), SweepReport::default());
        assert_eq!(log.borrow().as_slice(), &[doomed]);
    }

    #[test]
    fn force_destroy_is_idempotent() {
        let mut registry = EntityRegistry::new();
        let id = registry.insert(EntityTemplate::new(DUMMY, Vec2::ZERO), Inert);
        assert!(registry.destroy(id));
        assert!(!registry.destroy(id));
        assert!(!registry.destroy(EntityId(999)));
    }

    #[test]
    fn render_orders_by_depth_then_id() {
        let mut registry = EntityRegistry::new();
        registry.insert(
            EntityTemplate::new(DUMMY, Vec2::ZERO).with_depth(0),
            Marker { radius: 1.0 },
        );
        registry.insert(
            EntityTemplate::new(DUMMY, Vec2::ZERO).with_depth(-2),
            Marker { radius: 2.0 },
        );
        registry.insert(
            EntityTemplate::new(DUMMY, Vec2::ZERO).with_depth(0),
            Marker { radius: 3.0 },
        );

        let mut draw = DrawList::new();
        registry.render(&mut draw);
        let radii: Vec<f32> = draw
            .commands()
            .iter()
            .map(|command| match command {
                DrawCommand::Circle { radius, .. } => *radius,
                other => panic!("unexpected command {other:?}"),
            })
            .collect();
        assert_eq!(radii, vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn destroy_requests_apply_after_phase() {
        let mut registry = EntityRegistry::new();
        let requester = registry.insert(EntityTemplate::new(DUMMY, Vec2::ZERO), Inert);
        let target = registry.insert(EntityTemplate::new(DUMMY, Vec2::ZERO), Inert);
        let snapshot = registry.snapshot_for_dispatch();
        let mut env = env();

        registry.dispatch_each(&snapshot, &mut env, "step", |entity, _, ctx| {
            if entity.id() == requester {
                ctx.request_destroy(target);
            }
        });
        assert!(!registry.get(target).expect("target").is_destroyed());

        registry.apply_commands();
        assert!(registry.get(target).expect("target").is_destroyed());
    }

    #[test]
    fn lookup_sees_snapshot_copies() {
        let mut registry = EntityRegistry::new();
        let watcher = registry.insert(EntityTemplate::new(DUMMY, Vec2::ZERO), Inert);
        let target = registry.insert(EntityTemplate::new(DUMMY, Vec2::new(7.0, 8.0)), Inert);
        let snapshot = registry.snapshot_for_dispatch();
        let mut env = env();

        let mut seen = None;
        registry.dispatch_each(&snapshot, &mut env, "step", |entity, _, ctx| {
            if entity.id() == watcher {
                seen = ctx.lookup(target).map(|other| other.position);
                assert!(ctx.lookup(EntityId(1234)).is_none());
            }
        });
        assert_eq!(seen, Some(Vec2::new(7.0, 8.0)));
    }
}
