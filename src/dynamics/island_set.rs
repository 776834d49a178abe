use crate::dynamics::joint::Constraint;
use crate::dynamics::RigidBody;

/// The index of an island in an [`IslandSet`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct IslandHandle(pub usize);

/// A group of bodies interacting through joints, solved independently of the other islands.
///
/// Body 0 of every island is the immovable sentinel: joints attached to it are attached to the
/// world. The bodies given when creating the island get the indices `1..`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Island {
    body_start: usize,
    body_count: usize,
    joint_start: usize,
    joint_count: usize,
    skeletons: Vec<usize>,
    pub(crate) sleeping: bool,
}

impl Island {
    /// Number of bodies, including the sentinel.
    pub fn num_bodies(&self) -> usize {
        self.body_count
    }

    /// Number of joints.
    pub fn num_joints(&self) -> usize {
        self.joint_count
    }

    /// The joint count of each skeleton chain, in order.
    ///
    /// Chains occupy the last joints of the island.
    pub fn skeletons(&self) -> &[usize] {
        &self.skeletons
    }

    /// Whether every body of this island is asleep.
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }
}

/// A mutable view on one island and its bodies and joints.
pub struct IslandView<'a> {
    /// The island.
    pub island: &'a mut Island,
    /// The bodies of the island, starting with the sentinel.
    pub bodies: &'a mut [RigidBody],
    /// The joints of the island.
    pub constraints: &'a mut [Constraint],
}

/// The storage of all the islands of a simulation.
///
/// The bodies and joints of all the islands are stored contiguously, island after island, so
/// each island can be handed to a different thread.
#[derive(Default)]
pub struct IslandSet {
    bodies: Vec<RigidBody>,
    constraints: Vec<Constraint>,
    islands: Vec<Island>,
}

impl IslandSet {
    /// Creates an empty set of islands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an island made of the given bodies and joints.
    ///
    /// Joints refer to bodies by island-local index: `0` is the sentinel, and the bodies given
    /// here are numbered from `1` in order.
    pub fn add_island(
        &mut self,
        bodies: impl IntoIterator<Item = RigidBody>,
        constraints: impl IntoIterator<Item = Constraint>,
    ) -> IslandHandle {
        self.add_island_with_skeletons(bodies, constraints, Vec::new())
    }

    /// Adds an island whose last joints form chains solved exactly.
    ///
    /// `skeletons` gives the number of joints of each chain. The chains are made of the last
    /// joints of `constraints`, in order.
    ///
    /// # Panics
    ///
    /// Panics if a joint refers to a body outside of the island, or if the chains contain more
    /// joints than the island.
    pub fn add_island_with_skeletons(
        &mut self,
        bodies: impl IntoIterator<Item = RigidBody>,
        constraints: impl IntoIterator<Item = Constraint>,
        skeletons: Vec<usize>,
    ) -> IslandHandle {
        let body_start = self.bodies.len();
        let joint_start = self.constraints.len();

        self.bodies.push(RigidBody::sentinel());
        self.bodies.extend(bodies);
        self.constraints.extend(constraints);

        let body_count = self.bodies.len() - body_start;
        let joint_count = self.constraints.len() - joint_start;

        for constraint in &self.constraints[joint_start..] {
            assert!(
                constraint.body0 < body_count && constraint.body1 < body_count,
                "Joint attached to a body outside of its island."
            );
        }
        assert!(
            skeletons.iter().sum::<usize>() <= joint_count,
            "The skeleton chains have more joints than the island."
        );

        let sleeping = self.bodies[body_start + 1..]
            .iter()
            .all(|b| b.sleeping || !b.is_dynamic());

        self.islands.push(Island {
            body_start,
            body_count,
            joint_start,
            joint_count,
            skeletons,
            sleeping,
        });

        IslandHandle(self.islands.len() - 1)
    }

    /// Removes all the islands.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.constraints.clear();
        self.islands.clear();
    }

    /// The number of islands.
    pub fn len(&self) -> usize {
        self.islands.len()
    }

    /// Is this set empty?
    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    /// The island with the given handle.
    pub fn get(&self, handle: IslandHandle) -> Option<&Island> {
        self.islands.get(handle.0)
    }

    /// Iterates through all the islands.
    pub fn iter(&self) -> impl Iterator<Item = (IslandHandle, &Island)> {
        self.islands
            .iter()
            .enumerate()
            .map(|(i, island)| (IslandHandle(i), island))
    }

    /// The bodies of an island, starting with its sentinel.
    pub fn bodies(&self, handle: IslandHandle) -> &[RigidBody] {
        let island = &self.islands[handle.0];
        &self.bodies[island.body_start..island.body_start + island.body_count]
    }

    /// The bodies of an island, starting with its sentinel.
    pub fn bodies_mut(&mut self, handle: IslandHandle) -> &mut [RigidBody] {
        let island = &self.islands[handle.0];
        &mut self.bodies[island.body_start..island.body_start + island.body_count]
    }

    /// The joints of an island.
    pub fn constraints(&self, handle: IslandHandle) -> &[Constraint] {
        let island = &self.islands[handle.0];
        &self.constraints[island.joint_start..island.joint_start + island.joint_count]
    }

    /// The joints of an island.
    pub fn constraints_mut(&mut self, handle: IslandHandle) -> &mut [Constraint] {
        let island = &self.islands[handle.0];
        &mut self.constraints[island.joint_start..island.joint_start + island.joint_count]
    }

    /// Disjoint mutable views on every island.
    pub fn views_mut(&mut self) -> Vec<IslandView<'_>> {
        let mut views = Vec::with_capacity(self.islands.len());
        let mut bodies = &mut self.bodies[..];
        let mut constraints = &mut self.constraints[..];

        for island in &mut self.islands {
            let (island_bodies, rest) = std::mem::take(&mut bodies).split_at_mut(island.body_count);
            bodies = rest;
            let (island_constraints, rest) =
                std::mem::take(&mut constraints).split_at_mut(island.joint_count);
            constraints = rest;

            views.push(IslandView {
                island,
                bodies: island_bodies,
                constraints: island_constraints,
            });
        }

        views
    }
}
