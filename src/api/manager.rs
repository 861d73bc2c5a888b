//! The GPU memory manager.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::config::ArbiterConfig;
use crate::api::error::ArbiterError;
use crate::api::stats::{ManagedMemoryStats, MemoryUsageStats, ProcessUsage};
use crate::core::arena::Arena;
use crate::core::client::{ClientHandle, ClientState, OwnerId};
use crate::core::plan::{self, ClientDemand, PlanSummary};
use crate::core::sequence::SequenceChecker;
use crate::core::tracking::{BudgetStatus, ProcessId, TrackingGroup, TrackingGroupHandle};
use crate::diagnostics::{tracy, ArbiterEvent, DiagnosticsHooks};
use crate::notify::{BudgetChannel, BudgetMessage, QueueChannel, SurfaceOwner};
use crate::{gm_assert, gm_emit};

/// Arbitrates a global GPU memory budget between rendering surfaces.
///
/// The manager owns every client state and tracking group; callers hold
/// handles. Any event that can change the distribution (a client coming or
/// going, a visibility flip, new stats, a new ceiling) runs a full pass
/// before the call returns, then pushes changed budgets to the channel.
///
/// The manager takes no locks. It binds to the first thread that mutates it
/// and rejects calls from any other thread with
/// [`ArbiterError::WrongSequence`].
///
/// # Example
///
/// ```rust
/// use gpubudget::{ArbiterConfig, GpuMemoryManager, ManagedMemoryStats, OwnerId, ProcessId};
///
/// let config = ArbiterConfig::default().with_bytes_available(1000).with_minimum_per_client(0);
/// let (mut manager, queue) = GpuMemoryManager::with_queue(config);
///
/// let group = manager.tracking_group(ProcessId::new(42))?;
/// let tab = manager.create_client_state(OwnerId::new(1), group, true, true)?;
/// manager.set_client_managed_memory_stats(tab, ManagedMemoryStats::new(300, 0, 0))?;
///
/// assert_eq!(manager.client(tab).unwrap().bytes_allocation(), 300);
/// assert!(!queue.is_empty());
/// # Ok::<(), gpubudget::ArbiterError>(())
/// ```
pub struct GpuMemoryManager {
    config: ArbiterConfig,

    /// Client states, addressed by handle
    clients: Arena<ClientState>,

    /// Live client handles in registration order
    order: Vec<ClientHandle>,

    /// Tracking groups, one per process
    groups: Arena<TrackingGroup>,
    groups_by_process: HashMap<ProcessId, TrackingGroupHandle>,

    /// Where budgets are pushed
    channel: Arc<dyn BudgetChannel>,

    hooks: DiagnosticsHooks,
    sequence: SequenceChecker,

    next_registration: u64,
    pass: u64,
    last_summary: PlanSummary,

    bytes_allocated_current: usize,
    bytes_allocated_peak: usize,
}

impl GpuMemoryManager {
    /// Create a manager pushing budgets to `channel`.
    pub fn new(config: ArbiterConfig, channel: Arc<dyn BudgetChannel>) -> Self {
        log::debug!(
            "GPU memory manager created: {} bytes available, {} bytes minimum per client",
            config.bytes_available,
            config.bytes_minimum_per_client
        );

        Self {
            config,
            clients: Arena::new(),
            order: Vec::new(),
            groups: Arena::new(),
            groups_by_process: HashMap::new(),
            channel,
            hooks: DiagnosticsHooks::new(),
            sequence: SequenceChecker::new(),
            next_registration: 0,
            pass: 0,
            last_summary: PlanSummary::default(),
            bytes_allocated_current: 0,
            bytes_allocated_peak: 0,
        }
    }

    /// Create a manager with a fresh [`QueueChannel`], returned alongside.
    pub fn with_queue(config: ArbiterConfig) -> (Self, Arc<QueueChannel>) {
        let queue = Arc::new(QueueChannel::new());
        let manager = Self::new(config, queue.clone());
        (manager, queue)
    }

    // =========================================================================
    // Tracking groups
    // =========================================================================

    /// Get the tracking group for `process`, creating it on first use.
    pub fn tracking_group(&mut self, process: ProcessId) -> Result<TrackingGroupHandle, ArbiterError> {
        self.ensure_sequence()?;

        if let Some(&handle) = self.groups_by_process.get(&process) {
            return Ok(handle);
        }

        let handle = self.groups.insert(TrackingGroup::new(process));
        self.groups_by_process.insert(process, handle);
        log::debug!("tracking group {} created for pid {}", handle, process.raw());
        Ok(handle)
    }

    /// Record bytes the backend allocated on behalf of a process.
    pub fn add_usage(&mut self, group: TrackingGroupHandle, bytes: usize) -> Result<BudgetStatus, ArbiterError> {
        self.track_usage_change(group, 0, bytes)
    }

    /// Record bytes the backend freed on behalf of a process.
    pub fn remove_usage(&mut self, group: TrackingGroupHandle, bytes: usize) -> Result<BudgetStatus, ArbiterError> {
        self.track_usage_change(group, bytes, 0)
    }

    /// Record that an allocation of the group changed from `old_size` to
    /// `new_size` bytes.
    ///
    /// The result reflects the per-process ceiling, if one is configured.
    /// Usage never changes any client's budget by itself.
    pub fn track_usage_change(
        &mut self,
        group: TrackingGroupHandle,
        old_size: usize,
        new_size: usize,
    ) -> Result<BudgetStatus, ArbiterError> {
        self.ensure_sequence()?;

        let limit = self.config.bytes_per_process_limit;
        let tracked = self
            .groups
            .get_mut(group)
            .ok_or_else(|| Self::stale_group(group))?;

        let before = tracked.bytes_used();
        let previous_status = tracked.check_limit(limit);
        tracked.remove_usage(old_size);
        tracked.add_usage(new_size);
        let after = tracked.bytes_used();
        let status = tracked.check_limit(limit);
        let process = tracked.process();

        self.bytes_allocated_current = self.bytes_allocated_current.saturating_sub(before).saturating_add(after);
        self.bytes_allocated_peak = self.bytes_allocated_peak.max(self.bytes_allocated_current);

        if status == BudgetStatus::Exceeded && previous_status != BudgetStatus::Exceeded {
            gm_emit!(
                GM301,
                format!("pid {} uses {} bytes, limit {}", process.raw(), after, limit)
            );
            self.hooks.emit(ArbiterEvent::ProcessLimitExceeded {
                process,
                bytes_used: after,
                limit,
            });
        }

        Ok(status)
    }

    // =========================================================================
    // Client lifecycle
    // =========================================================================

    /// Register a rendering surface and run a pass.
    ///
    /// The new client starts awake, without stats, and with every computed
    /// field at zero; it claims nothing until it reports stats.
    pub fn create_client_state(
        &mut self,
        owner: OwnerId,
        tracking_group: TrackingGroupHandle,
        has_surface: bool,
        visible: bool,
    ) -> Result<ClientHandle, ArbiterError> {
        self.ensure_sequence()?;

        self.groups
            .get_mut(tracking_group)
            .ok_or_else(|| Self::stale_group(tracking_group))?
            .attach_client();

        let registration = self.next_registration;
        self.next_registration += 1;

        let handle = self.clients.insert(ClientState::new(
            owner,
            tracking_group,
            registration,
            has_surface,
            visible,
        ));
        self.order.push(handle);

        log::debug!(
            "client {} registered for owner {} (surface: {}, visible: {})",
            handle,
            owner.raw(),
            has_surface,
            visible
        );
        self.hooks.emit(ArbiterEvent::ClientCreated { client: handle, owner });

        self.run_pass();
        Ok(handle)
    }

    /// Unregister a client and run a pass over the remaining ones.
    ///
    /// The handle is dead afterwards; destroying it again is an error.
    pub fn destroy_client_state(&mut self, handle: ClientHandle) -> Result<(), ArbiterError> {
        self.ensure_sequence()?;

        let state = self
            .clients
            .remove(handle)
            .ok_or_else(|| Self::stale_client(handle))?;
        self.order.retain(|&live| live != handle);
        self.release_group(state.tracking_group());

        log::debug!("client {} destroyed (owner {})", handle, state.owner().raw());
        self.hooks.emit(ArbiterEvent::ClientDestroyed {
            client: handle,
            owner: state.owner(),
        });

        self.run_pass();
        Ok(())
    }

    /// Change a client's visibility. Unchanged visibility is a no-op;
    /// otherwise a pass runs. Becoming visible ends hibernation.
    pub fn set_client_visible(&mut self, handle: ClientHandle, visible: bool) -> Result<(), ArbiterError> {
        self.ensure_sequence()?;

        if self.update_visibility(handle, visible)? {
            self.run_pass();
        }
        Ok(())
    }

    /// Record a client's self-reported demand and run a pass.
    pub fn set_client_managed_memory_stats(
        &mut self,
        handle: ClientHandle,
        stats: ManagedMemoryStats,
    ) -> Result<(), ArbiterError> {
        self.ensure_sequence()?;

        self.clients
            .get_mut(handle)
            .ok_or_else(|| Self::stale_client(handle))?
            .set_managed_memory_stats(stats);

        self.run_pass();
        Ok(())
    }

    /// Pull visibility and stats from the surface owner and apply both with
    /// a single pass. Returns whether anything changed.
    pub fn sync_client_from_owner(
        &mut self,
        handle: ClientHandle,
        owner: &dyn SurfaceOwner,
    ) -> Result<bool, ArbiterError> {
        self.ensure_sequence()?;

        let mut changed = self.update_visibility(handle, owner.is_visible())?;
        if let Some(stats) = owner.managed_memory_stats() {
            if let Some(state) = self.clients.get_mut(handle) {
                state.set_managed_memory_stats(stats);
                changed = true;
            }
        }

        if changed {
            self.run_pass();
        }
        Ok(changed)
    }

    // =========================================================================
    // Arbitration
    // =========================================================================

    /// Replace the global ceiling and run a pass.
    pub fn set_bytes_available(&mut self, bytes: usize) -> Result<PlanSummary, ArbiterError> {
        self.ensure_sequence()?;
        self.config.bytes_available = bytes;
        Ok(self.run_pass())
    }

    /// Run a pass explicitly.
    ///
    /// Every mutating call already runs one; this is for callers that want
    /// the summary or that changed nothing and want to confirm stability.
    pub fn manage(&mut self) -> Result<PlanSummary, ArbiterError> {
        self.ensure_sequence()?;
        Ok(self.run_pass())
    }

    fn run_pass(&mut self) -> PlanSummary {
        self.pass += 1;

        let live: Vec<(ClientHandle, ClientDemand)> = self
            .order
            .iter()
            .filter_map(|&handle| self.clients.get(handle).map(|state| (handle, state.demand())))
            .collect();
        let demands: Vec<ClientDemand> = live.iter().map(|(_, demand)| *demand).collect();

        let computed = plan::compute(&self.config, &demands);
        let summary = computed.summary;
        let mut messages = 0;

        for ((handle, _), allocation) in live.iter().zip(computed.allocations) {
            let Some(state) = self.clients.get_mut(*handle) else {
                continue;
            };
            let owner = state.owner();
            let newly_hibernated = allocation.hibernated && !state.hibernated();

            if let Some(outgoing) = state.apply(allocation) {
                log::trace!(
                    "pass {}: owner {} limit {} bytes (hibernated: {})",
                    self.pass,
                    owner.raw(),
                    outgoing.bytes_limit,
                    outgoing.hibernated
                );
                self.channel.send(BudgetMessage {
                    owner,
                    client: *handle,
                    allocation: outgoing,
                    pass: self.pass,
                });
                messages += 1;
            }

            if newly_hibernated {
                log::debug!("client {} hibernated (owner {})", handle, owner.raw());
                self.hooks.emit(ArbiterEvent::ClientHibernated {
                    client: *handle,
                    owner,
                });
            }
        }

        if summary.degraded && !self.last_summary.degraded {
            gm_emit!(
                GM302,
                format!(
                    "{} visible surfaces, {} bytes available",
                    summary.visible_clients, self.config.bytes_available
                )
            );
            self.hooks.emit(ArbiterEvent::DegradedModeEntered {
                visible_clients: summary.visible_clients,
                bytes_available: self.config.bytes_available,
            });
        } else if !summary.degraded && self.last_summary.degraded {
            log::info!("GPU memory ceiling fits every visible surface again");
            self.hooks.emit(ArbiterEvent::DegradedModeLeft);
        }

        gm_assert!(
            summary.bytes_granted <= self.config.bytes_available,
            GM901,
            format!(
                "granted {} of {} bytes",
                summary.bytes_granted, self.config.bytes_available
            )
        );

        self.last_summary = summary;
        tracy::plot_pass(&summary, self.bytes_allocated_current);

        log::debug!(
            "pass {}: {} clients, {}/{} bytes granted, {} hibernated, {} messages{}",
            self.pass,
            live.len(),
            summary.bytes_granted,
            self.config.bytes_available,
            summary.hibernated_clients,
            messages,
            if summary.under_pressure { " (under pressure)" } else { "" }
        );
        self.hooks.emit(ArbiterEvent::PassCompleted {
            pass: self.pass,
            summary,
            messages,
        });

        summary
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Read a client's state. Stale handles return `None`.
    pub fn client(&self, handle: ClientHandle) -> Option<&ClientState> {
        self.clients.get(handle)
    }

    /// Iterate live clients in registration order.
    pub fn clients(&self) -> impl Iterator<Item = (ClientHandle, &ClientState)> + '_ {
        self.order
            .iter()
            .filter_map(|&handle| self.clients.get(handle).map(|state| (handle, state)))
    }

    /// Read a tracking group. Stale handles return `None`.
    pub fn group(&self, handle: TrackingGroupHandle) -> Option<&TrackingGroup> {
        self.groups.get(handle)
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Number of live tracking groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    /// Summary of the most recent pass.
    pub fn last_summary(&self) -> PlanSummary {
        self.last_summary
    }

    /// Number of passes run so far.
    pub fn pass_count(&self) -> u64 {
        self.pass
    }

    pub fn bytes_allocated_current(&self) -> usize {
        self.bytes_allocated_current
    }

    pub fn bytes_allocated_peak(&self) -> usize {
        self.bytes_allocated_peak
    }

    /// Aggregate usage for diagnostics.
    pub fn usage_stats(&self) -> MemoryUsageStats {
        let mut processes: Vec<ProcessUsage> = self
            .groups
            .iter()
            .map(|(_, group)| ProcessUsage {
                process: group.process(),
                bytes_used: group.bytes_used(),
                bytes_peak: group.bytes_peak(),
                clients: group.client_count(),
            })
            .collect();
        processes.sort_by_key(|usage| usage.process);

        let mut stats = MemoryUsageStats {
            processes,
            bytes_allocated_current: self.bytes_allocated_current,
            bytes_allocated_peak: self.bytes_allocated_peak,
            bytes_available: self.config.bytes_available,
            client_count: self.clients.len(),
            last_pass: self.last_summary,
            ..MemoryUsageStats::default()
        };

        for (_, state) in self.clients.iter() {
            if !state.managed_memory_stats_received() {
                continue;
            }
            let reported = state.managed_memory_stats();
            stats.bytes_required_total = stats.bytes_required_total.saturating_add(reported.bytes_required);
            stats.bytes_nice_to_have_total = stats.bytes_nice_to_have_total.saturating_add(reported.bytes_nice_to_have);
            stats.bytes_unused_total = stats.bytes_unused_total.saturating_add(reported.bytes_unused);
        }

        stats
    }

    /// Event listeners.
    pub fn hooks_mut(&mut self) -> &mut DiagnosticsHooks {
        &mut self.hooks
    }

    /// Allow the next mutating call to bind the manager to its thread.
    ///
    /// Use after handing the manager to another thread on purpose.
    pub fn detach_from_sequence(&mut self) {
        self.sequence.detach();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_sequence(&mut self) -> Result<(), ArbiterError> {
        if self.sequence.called_on_valid_sequence() {
            Ok(())
        } else {
            gm_emit!(GM201, format!("called from {:?}", std::thread::current().id()));
            Err(ArbiterError::WrongSequence)
        }
    }

    /// Apply a visibility change; returns whether it changed.
    fn update_visibility(&mut self, handle: ClientHandle, visible: bool) -> Result<bool, ArbiterError> {
        let state = self
            .clients
            .get_mut(handle)
            .ok_or_else(|| Self::stale_client(handle))?;

        let was_hibernated = state.hibernated();
        if !state.set_visible(visible) {
            return Ok(false);
        }
        let owner = state.owner();

        log::debug!("client {} visible: {}", handle, visible);
        if visible && was_hibernated {
            self.hooks.emit(ArbiterEvent::ClientWoke { client: handle, owner });
        }
        Ok(true)
    }

    /// Drop a client's reference to its group, releasing the group with the
    /// last one.
    fn release_group(&mut self, handle: TrackingGroupHandle) {
        let Some(group) = self.groups.get_mut(handle) else {
            return;
        };
        if !group.detach_client() {
            return;
        }
        if let Some(group) = self.groups.remove(handle) {
            self.groups_by_process.remove(&group.process());
            self.bytes_allocated_current = self.bytes_allocated_current.saturating_sub(group.bytes_used());
            log::debug!(
                "tracking group {} released for pid {} ({} bytes still attributed)",
                handle,
                group.process().raw(),
                group.bytes_used()
            );
        }
    }

    fn stale_client(handle: ClientHandle) -> ArbiterError {
        gm_emit!(GM001, format!("client {}", handle));
        ArbiterError::StaleClient(handle)
    }

    fn stale_group(handle: TrackingGroupHandle) -> ArbiterError {
        gm_emit!(GM002, format!("tracking group {}", handle));
        ArbiterError::StaleTrackingGroup(handle)
    }
}
