//! Budget distribution across registered clients.
//!
//! A pass is a pure function of the configuration and the client demands in
//! registration order. Nothing here touches the manager, so the same inputs
//! always produce the same plan.
//!
//! Clients fall into three tiers:
//!
//! | Tier       | Members                                               |
//! |------------|-------------------------------------------------------|
//! | Foreground | visible, owns a surface, has reported stats           |
//! | Background | visible without a surface, or invisible and awake     |
//! | Idle       | no stats yet, or invisible and hibernated             |
//!
//! Slack is handed out in three rounds. The foreground required tier
//! comes first. Next, background clients get a reserved slice of their
//! required tier (discounted for invisible ones), and only then do
//! foreground clients grow into nice-to-have. Whatever is left tops
//! background clients up toward their nice-to-have.

use crate::api::config::ArbiterConfig;
use crate::api::stats::ManagedMemoryStats;
use crate::util::size::percent_of;

/// Arbitration input for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClientDemand {
    pub has_surface: bool,
    pub visible: bool,
    pub hibernated: bool,
    pub stats: Option<ManagedMemoryStats>,
}

/// Fields computed for one client by a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientAllocation {
    /// Budget granted by this pass. Sums to at most the ceiling.
    pub bytes_allocation: usize,

    /// Budget the client may count on while visible.
    pub bytes_allocation_when_visible: usize,

    /// Lower bound of worthwhile nice-to-have growth.
    pub bytes_nicetohave_limit_low: usize,

    /// Upper bound of worthwhile nice-to-have growth.
    pub bytes_nicetohave_limit_high: usize,

    /// Required plus nice-to-have, clamped to the limits above.
    pub bytes_allocation_ideal_nicetohave: usize,

    /// Required tier, clamped to the minimum for visible surfaces.
    pub bytes_allocation_ideal_required: usize,

    /// Minimum viable allocation for this client.
    pub bytes_allocation_ideal_minimum: usize,

    /// Whether the client is hibernated after this pass.
    pub hibernated: bool,
}

/// Aggregate outcome of a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    /// Sum of `bytes_allocation` over all clients.
    pub bytes_granted: usize,

    /// Sum of the foreground required tier.
    pub bytes_visible_required: usize,

    /// Number of foreground clients.
    pub visible_clients: usize,

    /// Number of clients hibernated after the pass.
    pub hibernated_clients: usize,

    /// Visible demand crowded out the background tier.
    pub under_pressure: bool,

    /// The ceiling could not fit every foreground minimum.
    pub degraded: bool,
}

pub(crate) struct Plan {
    pub allocations: Vec<ClientAllocation>,
    pub summary: PlanSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Foreground,
    Background,
    Idle,
}

impl ClientDemand {
    fn tier(&self) -> Tier {
        match self.stats {
            None => Tier::Idle,
            Some(_) if self.visible && self.has_surface => Tier::Foreground,
            Some(_) if self.visible => Tier::Background,
            Some(_) if self.hibernated => Tier::Idle,
            Some(_) => Tier::Background,
        }
    }

    /// Invisible surfaces are the ones hibernation applies to.
    fn can_hibernate(&self) -> bool {
        !self.visible && self.has_surface && self.stats.is_some()
    }
}

/// Run one arbitration pass.
pub(crate) fn compute(config: &ArbiterConfig, demands: &[ClientDemand]) -> Plan {
    let ceiling = config.bytes_available;
    let minimum = config.bytes_minimum_per_client;

    let mut allocations: Vec<ClientAllocation> = demands
        .iter()
        .map(|demand| ideal_allocation(config, demand))
        .collect();

    let foreground: Vec<usize> = indices_in_tier(demands, Tier::Foreground);
    let background: Vec<usize> = indices_in_tier(demands, Tier::Background);

    let required_total: u128 = foreground
        .iter()
        .map(|&i| allocations[i].bytes_allocation_ideal_required as u128)
        .sum();
    let minimum_total = foreground.len() as u128 * minimum as u128;

    let mut summary = PlanSummary {
        bytes_visible_required: required_total.min(usize::MAX as u128) as usize,
        visible_clients: foreground.len(),
        ..PlanSummary::default()
    };

    // Slack left for the background tier after every reservation and all
    // foreground growth.
    let mut background_slack = 0usize;
    let mut reserved = vec![0usize; demands.len()];

    if minimum > 0 && minimum_total > ceiling as u128 {
        // Degraded: admit as many foreground clients as fit, in
        // registration order, at exactly the minimum.
        summary.degraded = true;
        summary.under_pressure = true;
        let admitted = ceiling / minimum;
        for (rank, &i) in foreground.iter().enumerate() {
            if rank < admitted {
                allocations[i].bytes_allocation = minimum;
            } else {
                allocations[i].bytes_allocation = 0;
                allocations[i].hibernated = true;
            }
        }
    } else if required_total > ceiling as u128 {
        // Ration the required tier above the guaranteed minimum.
        summary.under_pressure = true;
        let pool = ceiling as u128 - minimum_total;
        let excess_total = required_total - minimum_total;
        for &i in &foreground {
            let excess = (allocations[i].bytes_allocation_ideal_required - minimum) as u128;
            let share = excess * pool / excess_total;
            allocations[i].bytes_allocation = minimum + share as usize;
        }
    } else {
        let slack = ceiling - required_total as usize;

        // Every non-foreground client with stats holds a share of its
        // required tier ahead of nice-to-have growth. Hibernated clients
        // keep theirs too, so the set does not depend on the ceiling.
        let holders: Vec<(usize, usize)> = demands
            .iter()
            .enumerate()
            .filter(|(_, demand)| demand.stats.is_some() && demand.tier() != Tier::Foreground)
            .map(|(i, demand)| (i, reserve_target(config, demand, &allocations[i])))
            .collect();
        let reserve_total: u128 = holders.iter().map(|&(_, target)| target as u128).sum();

        let mut reserved_sum = 0usize;
        for &(i, target) in &holders {
            reserved[i] = fill(target, slack, reserve_total);
            reserved_sum += reserved[i];
        }

        let growth_pool = slack - reserved_sum;
        let headroom_total: u128 = foreground
            .iter()
            .map(|&i| headroom(&allocations[i]) as u128)
            .sum();

        for &i in &foreground {
            let growth = fill(headroom(&allocations[i]), growth_pool, headroom_total);
            allocations[i].bytes_allocation = allocations[i].bytes_allocation_ideal_required + growth;
        }

        if growth_pool as u128 >= headroom_total {
            background_slack = growth_pool - headroom_total as usize;
        }

        let threshold = percent_of(ceiling, config.hibernation_threshold_percent) as u128;
        summary.under_pressure = required_total > threshold;
    }

    if summary.under_pressure {
        for &i in &background {
            allocations[i].bytes_allocation = 0;
            if demands[i].can_hibernate() {
                allocations[i].hibernated = true;
            }
        }
    } else {
        let extras: Vec<usize> = background
            .iter()
            .map(|&i| background_target(config, &demands[i], &allocations[i]).saturating_sub(reserved[i]))
            .collect();
        let extra_total: u128 = extras.iter().map(|&extra| extra as u128).sum();

        for (&i, &extra) in background.iter().zip(&extras) {
            allocations[i].bytes_allocation = reserved[i] + fill(extra, background_slack, extra_total);
        }
    }

    for (allocation, demand) in allocations.iter_mut().zip(demands) {
        if demand.visible {
            allocation.bytes_allocation_when_visible = allocation.bytes_allocation;
        }
        if allocation.hibernated {
            summary.hibernated_clients += 1;
        }
        summary.bytes_granted = summary.bytes_granted.saturating_add(allocation.bytes_allocation);
    }

    Plan {
        allocations,
        summary,
    }
}

fn indices_in_tier(demands: &[ClientDemand], tier: Tier) -> Vec<usize> {
    demands
        .iter()
        .enumerate()
        .filter(|(_, demand)| demand.tier() == tier)
        .map(|(i, _)| i)
        .collect()
}

/// `target` if `available` covers `total`, else its proportional share.
fn fill(target: usize, available: usize, total: u128) -> usize {
    if available as u128 >= total {
        target
    } else {
        (target as u128 * available as u128 / total) as usize
    }
}

fn headroom(allocation: &ClientAllocation) -> usize {
    allocation.bytes_allocation_ideal_nicetohave - allocation.bytes_allocation_ideal_required
}

/// Limits and ideals for one client; grants are filled in later.
fn ideal_allocation(config: &ArbiterConfig, demand: &ClientDemand) -> ClientAllocation {
    let floor = if demand.has_surface {
        config.bytes_minimum_per_client
    } else {
        0
    };
    let cap = config.effective_maximum_per_client().max(floor);

    // Sticky until visible again.
    let hibernated = demand.hibernated && !demand.visible;

    let Some(stats) = demand.stats else {
        return ClientAllocation {
            bytes_allocation_ideal_minimum: floor,
            hibernated,
            ..ClientAllocation::default()
        };
    };

    let required = if demand.visible && demand.has_surface {
        stats.bytes_required.clamp(floor, cap)
    } else {
        stats.bytes_required.min(cap)
    };
    let limit_low = required;
    let limit_high = cap;
    let nicetohave = stats.bytes_desired().clamp(limit_low, limit_high);

    let when_visible = if demand.visible {
        0
    } else {
        stats
            .bytes_required
            .clamp(floor, cap)
            .min(config.bytes_available)
    };

    ClientAllocation {
        bytes_allocation: 0,
        bytes_allocation_when_visible: when_visible,
        bytes_nicetohave_limit_low: limit_low,
        bytes_nicetohave_limit_high: limit_high,
        bytes_allocation_ideal_nicetohave: nicetohave,
        bytes_allocation_ideal_required: required,
        bytes_allocation_ideal_minimum: floor,
        hibernated,
    }
}

/// The part of a background client's demand served before foreground
/// clients grow into nice-to-have.
fn reserve_target(
    config: &ArbiterConfig,
    demand: &ClientDemand,
    allocation: &ClientAllocation,
) -> usize {
    if demand.visible {
        return allocation.bytes_allocation_ideal_required;
    }
    let unused = demand.stats.map_or(0, |stats| stats.bytes_unused);
    percent_of(
        allocation.bytes_allocation_ideal_required.saturating_sub(unused),
        config.invisible_allocation_percent,
    )
}

/// What a background client would like out of the leftover slack.
fn background_target(
    config: &ArbiterConfig,
    demand: &ClientDemand,
    allocation: &ClientAllocation,
) -> usize {
    if demand.visible {
        return allocation.bytes_allocation_ideal_nicetohave;
    }
    let unused = demand.stats.map_or(0, |stats| stats.bytes_unused);
    percent_of(
        allocation.bytes_allocation_ideal_nicetohave.saturating_sub(unused),
        config.invisible_allocation_percent,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ceiling: usize, minimum: usize) -> ArbiterConfig {
        ArbiterConfig::default()
            .with_bytes_available(ceiling)
            .with_minimum_per_client(minimum)
            .with_maximum_per_client(ceiling)
    }

    fn visible(required: usize, nice_to_have: usize) -> ClientDemand {
        ClientDemand {
            has_surface: true,
            visible: true,
            hibernated: false,
            stats: Some(ManagedMemoryStats::new(required, nice_to_have, 0)),
        }
    }

    fn invisible(required: usize, nice_to_have: usize) -> ClientDemand {
        ClientDemand {
            visible: false,
            ..visible(required, nice_to_have)
        }
    }

    fn granted(plan: &Plan) -> Vec<usize> {
        plan.allocations.iter().map(|a| a.bytes_allocation).collect()
    }

    #[test]
    fn test_proportional_rationing() {
        let plan = compute(&config(1000, 0), &[visible(600, 0), visible(600, 0)]);
        assert_eq!(granted(&plan), vec![500, 500]);
        assert!(plan.summary.under_pressure);
        assert!(!plan.summary.degraded);
    }

    #[test]
    fn test_rationing_keeps_minimum() {
        let plan = compute(&config(1000, 100), &[visible(100, 0), visible(2000, 0)]);
        let grants = granted(&plan);
        assert_eq!(grants[0], 100);
        assert_eq!(grants[1], 900);
    }

    #[test]
    fn test_nicetohave_growth_shares_slack() {
        // required 200 each, slack 600, headroom 400 + 800
        let plan = compute(&config(1000, 0), &[visible(200, 400), visible(200, 800)]);
        assert_eq!(granted(&plan), vec![200 + 200, 200 + 400]);
        assert_eq!(plan.summary.bytes_granted, 1000);
    }

    #[test]
    fn test_nicetohave_fully_satisfied() {
        let plan = compute(&config(1000, 0), &[visible(100, 50)]);
        assert_eq!(granted(&plan), vec![150]);
        assert_eq!(plan.allocations[0].bytes_allocation_ideal_nicetohave, 150);
    }

    #[test]
    fn test_nicetohave_clamped_to_limit_high() {
        let cfg = config(10_000, 0).with_maximum_per_client(500);
        let plan = compute(&cfg, &[visible(100, 5_000)]);
        let allocation = plan.allocations[0];
        assert_eq!(allocation.bytes_nicetohave_limit_high, 500);
        assert_eq!(allocation.bytes_allocation_ideal_nicetohave, 500);
        assert_eq!(allocation.bytes_allocation, 500);
    }

    #[test]
    fn test_required_clamped_to_minimum() {
        let plan = compute(&config(1000, 100), &[visible(10, 0)]);
        assert_eq!(plan.allocations[0].bytes_allocation_ideal_required, 100);
        assert_eq!(plan.allocations[0].bytes_allocation, 100);
    }

    #[test]
    fn test_invisible_gets_discounted_slack() {
        let plan = compute(&config(1000, 0), &[visible(300, 0), invisible(300, 0)]);
        let grants = granted(&plan);
        assert_eq!(grants[0], 300);
        assert_eq!(grants[1], 150);
        assert!(!plan.allocations[1].hibernated);
    }

    #[test]
    fn test_invisible_keeps_share_beside_greedy_visible() {
        let plan = compute(&config(1000, 0), &[visible(300, 1000), invisible(300, 0)]);
        assert!(!plan.summary.under_pressure);
        assert!(!plan.allocations[1].hibernated);
        // 150 reserved for the hidden surface, the rest grows the visible one.
        assert_eq!(granted(&plan), vec![850, 150]);
        assert_eq!(plan.summary.bytes_granted, 1000);
    }

    #[test]
    fn test_reservations_shrink_with_slack() {
        let helper = ClientDemand {
            has_surface: false,
            ..visible(200, 0)
        };
        // Slack 150 against reservations of 200 + 100.
        let plan = compute(&config(1000, 0), &[visible(850, 500), helper, invisible(200, 0)]);
        assert_eq!(granted(&plan), vec![850, 100, 50]);
        assert!(!plan.summary.under_pressure);
    }

    #[test]
    fn test_background_tops_up_after_growth() {
        let plan = compute(&config(1000, 0), &[visible(200, 100), invisible(200, 400)]);
        // Reserved 100, growth 100, then 600 left to top up to 300.
        assert_eq!(granted(&plan), vec![300, 300]);
    }

    #[test]
    fn test_grants_never_fall_as_ceiling_rises() {
        let helper = ClientDemand {
            has_surface: false,
            ..visible(120, 80)
        };
        let demands = [visible(300, 900), invisible(300, 200), helper, visible(100, 0)];
        for threshold in [60, 80, 100] {
            let mut previous = vec![0; demands.len()];
            for ceiling in (0..3000).step_by(7) {
                let cfg = ArbiterConfig::default()
                    .with_bytes_available(ceiling)
                    .with_minimum_per_client(20)
                    .with_maximum_per_client(1000)
                    .with_hibernation_threshold(threshold);
                let plan = compute(&cfg, &demands);
                let grants = granted(&plan);
                assert!(grants.iter().sum::<usize>() <= ceiling);
                for (now, before) in grants.iter().zip(&previous) {
                    assert!(now >= before, "ceiling {} threshold {}: {:?} after {:?}", ceiling, threshold, grants, previous);
                }
                previous = grants;
            }
        }
    }

    #[test]
    fn test_invisible_hibernated_under_pressure() {
        let plan = compute(
            &config(1000, 0),
            &[visible(600, 0), visible(600, 0), invisible(300, 0)],
        );
        assert_eq!(plan.allocations[2].bytes_allocation, 0);
        assert!(plan.allocations[2].hibernated);
        assert_eq!(plan.summary.hibernated_clients, 1);
    }

    #[test]
    fn test_hibernation_threshold() {
        let cfg = config(1000, 0).with_hibernation_threshold(50);
        let plan = compute(&cfg, &[visible(600, 0), invisible(100, 0)]);
        assert!(plan.summary.under_pressure);
        assert_eq!(plan.allocations[0].bytes_allocation, 600);
        assert!(plan.allocations[1].hibernated);
    }

    #[test]
    fn test_degraded_mode_admits_in_order() {
        let plan = compute(&config(250, 100), &[visible(100, 0), visible(100, 0), visible(100, 0)]);
        assert!(plan.summary.degraded);
        assert_eq!(granted(&plan), vec![100, 100, 0]);
        assert!(!plan.allocations[0].hibernated);
        assert!(plan.allocations[2].hibernated);
    }

    #[test]
    fn test_no_stats_means_no_demand() {
        let fresh = ClientDemand {
            has_surface: true,
            visible: true,
            hibernated: false,
            stats: None,
        };
        let plan = compute(&config(1000, 100), &[fresh, visible(300, 0)]);
        assert_eq!(plan.allocations[0].bytes_allocation_ideal_required, 0);
        assert_eq!(plan.allocations[0].bytes_allocation, 0);
        assert_eq!(plan.allocations[1].bytes_allocation, 300);
    }

    #[test]
    fn test_surfaceless_client_stays_background() {
        let helper = ClientDemand {
            has_surface: false,
            ..visible(300, 0)
        };
        let plan = compute(&config(1000, 100), &[helper]);
        assert_eq!(plan.summary.visible_clients, 0);
        assert_eq!(plan.allocations[0].bytes_allocation_ideal_minimum, 0);
        assert_eq!(plan.allocations[0].bytes_allocation, 300);
    }

    #[test]
    fn test_sticky_hibernation() {
        let sleeping = ClientDemand {
            hibernated: true,
            ..invisible(300, 0)
        };
        let plan = compute(&config(1_000_000, 0), &[sleeping]);
        assert_eq!(plan.allocations[0].bytes_allocation, 0);
        assert!(plan.allocations[0].hibernated);
    }

    #[test]
    fn test_pass_is_deterministic() {
        let demands = [visible(600, 100), invisible(300, 300), visible(50, 0)];
        let cfg = config(1000, 100);
        let first = compute(&cfg, &demands);
        let second = compute(&cfg, &demands);
        assert_eq!(first.allocations, second.allocations);
        assert_eq!(first.summary, second.summary);
    }
}
