// ==============================================================================
// world.rs: RAPIER HOST WORLD (TOP-DOWN PLANE)
// ------------------------------------------------------------------------------
// Owns the rigid bodies and the vehicles driving them. The track is the XY
// plane: zero gravity, Z translation and all rotations locked on every chassis.
// Headings are pushed onto the bodies as absolute rotations about +Z.
//
// step(dt):
// 1) every vehicle samples its input and runs its model (sorted by id)
//    - drift: velocity + rotation overwritten on a dynamic body
//    - kinematic: next pose set on a kinematic position-based body
// 2) rapier integrates positions and resolves car-to-car contacts
// 3) drift vehicles read back position/velocity from their bodies
// 4) runaway vehicles are reset to their grid slot
//
// A vehicle whose body has vanished is skipped for that tick with a warning.
// ==============================================================================

use std::collections::HashMap;
use std::fmt;

use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::arcade::{
    ConfigError, DriftModel, ForceIntegrator, KinematicModel, ModelKind, Vec2, VehicleModel,
    VehicleState,
};
use crate::config::ServerConfig;
use crate::input::RawInput;
use crate::spawn::{SpawnManager, SpawnPoint};
use crate::state::Entity;
use crate::vehicle::{Vehicle, VehicleSnapshot};

const CHASSIS_HALF_EXTENTS: [f32; 3] = [0.9, 2.0, 0.5]; // [width, length, height] / 2, meters
const KINEMATIC_MASS: f32 = 1.0;                        // unused by rapier, keeps colliders uniform
const ARENA_LIMIT: f32 = 5_000.0;                       // meters from origin

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    UnknownVehicle(String),
    MissingBody { vehicle: String },
    GridFull { capacity: usize },
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::UnknownVehicle(id) => write!(f, "no vehicle with id {id}"),
            WorldError::MissingBody { vehicle } => write!(f, "rigid body missing for vehicle {vehicle}"),
            WorldError::GridFull { capacity } => write!(f, "starting grid full ({capacity} slots)"),
        }
    }
}

impl std::error::Error for WorldError {}

/// Drift steps fold engine force into the chassis velocity using the body's
/// own mass. Damping is left to the rapier pipeline.
impl ForceIntegrator for RigidBody {
    fn integrate_force(&self, velocity: Vec2, force: Vec2, dt: f32) -> Vec2 {
        let mass = self.mass();
        if mass > 0.0 { velocity + force * (dt / mass) } else { velocity }
    }
}

#[inline]
fn heading_rotation(heading: f32) -> Rotation<Real> {
    UnitQuaternion::from_axis_angle(&Vector::z_axis(), heading.to_radians())
}

#[inline]
fn plane(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y, 0.0]
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,                       // zero on a top-down track
    pub integration_parameters: IntegrationParameters,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub vehicles: HashMap<String, Vehicle>,          // vehicle id -> vehicle
    spawns: SpawnManager,
    drift: DriftModel,
    kinematic: KinematicModel,
}

impl PhysicsWorld {
    pub fn new(drift: DriftModel, kinematic: KinematicModel, max_vehicles: usize) -> Self {
        Self {
            gravity: vector![0.0, 0.0, 0.0],
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            vehicles: HashMap::new(),
            spawns: SpawnManager::new(max_vehicles),
            drift,
            kinematic,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let (drift, kinematic) = config.build_models()?;
        Ok(Self::new(drift, kinematic, config.max_vehicles))
    }

    fn model_for(&self, kind: ModelKind) -> VehicleModel {
        match kind {
            ModelKind::Drift => self.drift.clone().into(),
            ModelKind::Kinematic => self.kinematic.clone().into(),
        }
    }

    fn insert_chassis(&mut self, model: &VehicleModel, state: &VehicleState) -> RigidBodyHandle {
        let (builder, mass) = match model {
            VehicleModel::Drift(m) => (
                RigidBodyBuilder::dynamic()
                    .linear_damping(m.config().linear_damping)
                    .ccd_enabled(true),
                m.config().mass,
            ),
            VehicleModel::Kinematic(_) => (RigidBodyBuilder::kinematic_position_based(), KINEMATIC_MASS),
        };

        let rb = builder
            .translation(plane(state.position))
            .rotation(vector![0.0, 0.0, state.heading.to_radians()])
            .locked_axes(LockedAxes::TRANSLATION_LOCKED_Z | LockedAxes::ROTATION_LOCKED)
            .build();

        let [hx, hy, hz] = CHASSIS_HALF_EXTENTS;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .mass(mass)
            .friction(0.0)
            .restitution(0.2)
            .build();

        let handle = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    fn remove_chassis(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Spawns (or respawns, keeping the grid slot) a vehicle driven by `kind`.
    pub fn spawn_vehicle(&mut self, id: &str, kind: ModelKind) -> Result<SpawnPoint, WorldError> {
        let point = self
            .spawns
            .allocate_spawn(id)
            .ok_or(WorldError::GridFull { capacity: self.spawns.capacity() })?;

        if let Some(old) = self.vehicles.remove(id) {
            self.remove_chassis(old.body);
        }

        let model = self.model_for(kind);
        let state = model.initial_state(point.position, point.heading);
        let body = self.insert_chassis(&model, &state);
        self.vehicles.insert(id.to_string(), Vehicle::new(id.to_string(), body, model, state));

        info!(vehicle = id, model = %kind, slot = point.slot, "spawned vehicle");
        Ok(point)
    }

    pub fn despawn_vehicle(&mut self, id: &str) -> Option<Vehicle> {
        let vehicle = self.vehicles.remove(id)?;
        self.remove_chassis(vehicle.body);
        self.spawns.release(id);
        info!(vehicle = id, "despawned vehicle");
        Some(vehicle)
    }

    pub fn apply_input(&mut self, id: &str, input: RawInput) -> Result<(), WorldError> {
        let vehicle = self
            .vehicles
            .get_mut(id)
            .ok_or_else(|| WorldError::UnknownVehicle(id.to_string()))?;
        vehicle.input = input;
        Ok(())
    }

    /// Brings vehicles in line with the connected entities: spawn newcomers,
    /// respawn on model change, despawn the departed, forward latest input.
    pub fn apply_entities(&mut self, entities: &HashMap<String, Entity>) {
        let departed: Vec<String> = self
            .vehicles
            .keys()
            .filter(|id| !entities.contains_key(*id))
            .cloned()
            .collect();
        for id in departed {
            self.despawn_vehicle(&id);
        }

        for entity in entities.values() {
            let stale = self
                .vehicles
                .get(&entity.id)
                .is_none_or(|v| v.kind() != entity.model);

            if stale {
                if let Err(err) = self.spawn_vehicle(&entity.id, entity.model) {
                    warn!(vehicle = %entity.id, %err, "could not spawn vehicle");
                    continue;
                }
            }

            if let Some(latest) = entity.last_input {
                if let Err(err) = self.apply_input(&entity.id, latest.input) {
                    debug!(%err, "input dropped");
                }
            }
        }
    }

    /// One model step for one vehicle, written back onto its body.
    pub fn step_vehicle(&mut self, id: &str, dt: Real) -> Result<(), WorldError> {
        let vehicle = self
            .vehicles
            .get_mut(id)
            .ok_or_else(|| WorldError::UnknownVehicle(id.to_string()))?;
        let body = self
            .bodies
            .get_mut(vehicle.body)
            .ok_or_else(|| WorldError::MissingBody { vehicle: id.to_string() })?;

        let control = vehicle.latch.sample(&vehicle.input);
        vehicle.model.step(&mut vehicle.state, &control, dt, &*body);

        let state = &vehicle.state;
        match &vehicle.model {
            VehicleModel::Drift(_) => {
                body.set_linvel(plane(state.velocity), true);
                body.set_rotation(heading_rotation(state.heading), true);
            }
            VehicleModel::Kinematic(_) => {
                body.set_next_kinematic_translation(plane(state.position));
                body.set_next_kinematic_rotation(heading_rotation(state.heading));
            }
        }

        trace!(
            vehicle = id,
            gear = state.gear,
            heading = state.heading,
            vx = state.velocity.x,
            vy = state.velocity.y,
            "vehicle stepped"
        );
        Ok(())
    }

    pub fn step(&mut self, dt: Real) {
        // 1) Models, in a stable order
        let mut ids: Vec<String> = self.vehicles.keys().cloned().collect();
        ids.sort_unstable();
        for id in &ids {
            if let Err(err) = self.step_vehicle(id, dt) {
                warn!(%err, "vehicle step skipped");
            }
        }

        // 2) Rigid bodies
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &(),
        );

        // 3) Read back what rapier integrated
        self.sync_from_bodies();

        // 4) Safety: keep vehicles inside the arena
        self.reset_runaway_vehicles();
    }

    fn sync_from_bodies(&mut self) {
        for vehicle in self.vehicles.values_mut() {
            if vehicle.kind() != ModelKind::Drift {
                continue;
            }
            let Some(body) = self.bodies.get(vehicle.body) else { continue };
            let p = body.translation();
            let v = body.linvel();
            vehicle.state.position = Vec2::new(p.x, p.y);
            vehicle.state.velocity = Vec2::new(v.x, v.y);
        }
    }

    fn reset_runaway_vehicles(&mut self) {
        for vehicle in self.vehicles.values_mut() {
            let p = vehicle.state.position;
            let bad = !p.x.is_finite()
                || !p.y.is_finite()
                || p.x.abs() > ARENA_LIMIT
                || p.y.abs() > ARENA_LIMIT;
            if !bad {
                continue;
            }

            let Some(point) = self.spawns.allocate_spawn(&vehicle.id) else { continue };
            let Some(body) = self.bodies.get_mut(vehicle.body) else { continue };

            vehicle.state = vehicle.model.initial_state(point.position, point.heading);
            body.set_translation(plane(point.position), true);
            body.set_rotation(heading_rotation(point.heading), true);
            body.set_linvel(vector![0.0, 0.0, 0.0], true);

            warn!(vehicle = %vehicle.id, x = p.x, y = p.y, "reset runaway vehicle to its grid slot");
        }
    }

    /// Snapshot of every vehicle, sorted by id.
    pub fn snapshot(&self) -> Vec<VehicleSnapshot> {
        let mut out: Vec<VehicleSnapshot> = self.vehicles.values().map(Vehicle::snapshot).collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EntityInput;

    const DT: f32 = 1.0 / 60.0;

    fn world(max_vehicles: usize) -> PhysicsWorld {
        let config = ServerConfig { max_vehicles, ..Default::default() };
        PhysicsWorld::from_config(&config).unwrap()
    }

    fn entity(id: &str, model: ModelKind, input: Option<RawInput>) -> Entity {
        Entity {
            id: id.to_string(),
            model,
            last_input: input.map(|input| EntityInput { tick: 0, input }),
        }
    }

    #[test]
    fn drift_car_drives_forward_within_first_gear() {
        let mut w = world(4);
        w.spawn_vehicle("a", ModelKind::Drift).unwrap();
        w.apply_input("a", RawInput { throttle: 1.0, ..Default::default() }).unwrap();

        for _ in 0..120 {
            w.step(DT);
        }

        let snap = &w.snapshot()[0];
        assert_eq!(snap.model, ModelKind::Drift);
        assert_eq!(snap.gear, 1);
        assert!(snap.y > 0.0);
        assert!(snap.speed > 0.0 && snap.speed <= 5.0 + 1e-3, "speed {}", snap.speed);
    }

    #[test]
    fn kinematic_car_shifts_then_drives() {
        let mut w = world(4);
        w.spawn_vehicle("k", ModelKind::Kinematic).unwrap();

        w.apply_input("k", RawInput { clutch: true, gear_up: true, ..Default::default() }).unwrap();
        for _ in 0..5 {
            w.step(DT);
        }
        assert_eq!(w.vehicles["k"].state.gear, 1);

        w.apply_input("k", RawInput { throttle: 1.0, ..Default::default() }).unwrap();
        for _ in 0..30 {
            w.step(DT);
        }

        let k = &w.vehicles["k"];
        assert!(k.state.speed > 0.0 && k.state.speed <= 20.0);
        assert!(k.state.position.y > 0.0);
        let body = &w.bodies[k.body];
        assert!((body.translation().y - k.state.position.y).abs() < 1e-3);
    }

    #[test]
    fn missing_body_skips_only_that_vehicle() {
        let mut w = world(4);
        w.spawn_vehicle("a", ModelKind::Kinematic).unwrap();
        w.spawn_vehicle("b", ModelKind::Drift).unwrap();

        let handle = w.vehicles["a"].body;
        w.remove_chassis(handle);

        assert_eq!(
            w.step_vehicle("a", DT),
            Err(WorldError::MissingBody { vehicle: "a".to_string() })
        );
        w.apply_input("b", RawInput { throttle: 1.0, ..Default::default() }).unwrap();
        for _ in 0..30 {
            w.step(DT);
        }
        assert!(w.vehicles["b"].state.position.y > 0.0);
    }

    #[test]
    fn unknown_vehicle_and_full_grid() {
        let mut w = world(1);
        assert_eq!(
            w.apply_input("ghost", RawInput::default()),
            Err(WorldError::UnknownVehicle("ghost".to_string()))
        );
        w.spawn_vehicle("a", ModelKind::Drift).unwrap();
        assert_eq!(
            w.spawn_vehicle("b", ModelKind::Drift),
            Err(WorldError::GridFull { capacity: 1 })
        );
    }

    #[test]
    fn entities_drive_spawn_respawn_and_despawn() {
        let mut w = world(4);
        let mut entities = HashMap::new();
        entities.insert("a".to_string(), entity("a", ModelKind::Drift, None));
        w.apply_entities(&entities);

        let first = w.vehicles["a"].state.position;
        assert_eq!(w.vehicles["a"].kind(), ModelKind::Drift);

        let gas = RawInput { throttle: 1.0, ..Default::default() };
        entities.insert("a".to_string(), entity("a", ModelKind::Kinematic, Some(gas)));
        w.apply_entities(&entities);

        let a = &w.vehicles["a"];
        assert_eq!(a.kind(), ModelKind::Kinematic);
        assert_eq!(a.state.position, first);
        assert_eq!(a.input, gas);
        assert_eq!(w.bodies.len(), 1);

        entities.clear();
        w.apply_entities(&entities);
        assert!(w.vehicles.is_empty());
        assert_eq!(w.bodies.len(), 0);
        assert_eq!(w.colliders.len(), 0);
    }

    #[test]
    fn runaway_vehicle_returns_to_grid() {
        let mut w = world(4);
        let point = w.spawn_vehicle("k", ModelKind::Kinematic).unwrap();
        w.vehicles.get_mut("k").unwrap().state.position = Vec2::new(0.0, ARENA_LIMIT * 2.0);

        w.step(DT);

        let k = &w.vehicles["k"];
        assert_eq!(k.state.position, point.position);
        assert_eq!(k.state.gear, 0);
    }
}
