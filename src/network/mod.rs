//! Network topology planning.
//!
//! A [`NetworkPlan`] carves an IPv4 address space into one subnet per
//! (tier, availability zone) pair. Allocation is sequential and aligned, so
//! the resulting subnets are pairwise disjoint by construction. Planning is
//! pure: no provider resource exists until the plan is handed to a
//! [`crate::provider::Provider`], and the plan is immutable once built.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use thiserror::Error;


/// Classification of a subnet tier.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TierKind {
    /// Internet-facing subnets with public addresses.
    Public,
    /// Private subnets with outbound-only connectivity.
    PrivateWithEgress,
}

/// Longest tier prefix accepted; providers reserve addresses within each
/// subnet, so anything smaller than a /28 is unusable in practice.
pub const MAX_TIER_PREFIX_LEN: u8 = 28;

/// A requested subnet tier, spanning every availability zone in the plan.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TierSpec {
    /// Human-readable tier name (for example `Public`).
    pub name: String,
    /// Whether the tier faces the internet.
    pub kind: TierKind,
    /// Prefix length of each per-zone subnet in this tier.
    pub prefix_len: u8,
}

impl TierSpec {
    /// Creates a tier specification, trimming the name.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TierKind, prefix_len: u8) -> Self {
        Self {
            name: name.into().trim().to_owned(),
            kind,
            prefix_len,
        }
    }
}

/// A single allocated subnet within a [`NetworkPlan`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubnetPlan {
    /// Name of the tier this subnet belongs to.
    pub tier_name: String,
    /// Tier classification.
    pub kind: TierKind,
    /// Zero-based availability-zone index.
    pub zone_index: u8,
    /// Allocated address range.
    pub cidr: Ipv4Net,
}

/// Errors raised while planning a network topology.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum NetworkPlanError {
    /// Raised when fewer than one availability zone is requested.
    #[error("a network plan requires at least one availability zone")]
    NoZones,
    /// Raised when no subnet tiers are requested.
    #[error("a network plan requires at least one subnet tier")]
    NoTiers,
    /// Raised when a tier name is blank or repeated.
    #[error("tier name `{0}` is blank or duplicated")]
    InvalidTierName(String),
    /// Raised when a tier prefix does not fit inside the parent space.
    #[error(
        "tier `{tier}` prefix /{prefix_len} does not nest inside /{parent_prefix_len} \
         (must be longer than the parent and at most /{MAX_TIER_PREFIX_LEN})"
    )]
    PrefixOutOfRange {
        /// Offending tier name.
        tier: String,
        /// Requested tier prefix length.
        prefix_len: u8,
        /// Prefix length of the parent address space.
        parent_prefix_len: u8,
    },
    /// Raised when the parent space cannot hold every requested subnet.
    #[error("address space {cidr} exhausted while allocating tier `{tier}` zone {zone_index}")]
    SpaceExhausted {
        /// Parent address space.
        cidr: Ipv4Net,
        /// Tier being allocated when space ran out.
        tier: String,
        /// Zone index being allocated when space ran out.
        zone_index: u8,
    },
}

/// An immutable, fully allocated network topology.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkPlan {
    cidr: Ipv4Net,
    zone_count: u8,
    subnets: Vec<SubnetPlan>,
    service_gateways: Vec<String>,
}

impl NetworkPlan {
    /// Splits `cidr` into one subnet per (tier, zone) pair.
    ///
    /// Tiers are allocated in the order given, each spanning `zone_count`
    /// zones. Allocation fails fast before any resource reference exists.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkPlanError`] when the zone count is zero, the tier
    /// list is empty or contains blank/duplicate names, a tier prefix does
    /// not nest inside `cidr`, or the space cannot hold every subnet.
    pub fn new(
        cidr: Ipv4Net,
        zone_count: u8,
        tiers: &[TierSpec],
    ) -> Result<Self, NetworkPlanError> {
        if zone_count == 0 {
            return Err(NetworkPlanError::NoZones);
        }
        if tiers.is_empty() {
            return Err(NetworkPlanError::NoTiers);
        }
        validate_tier_names(tiers)?;

        let base = u64::from(u32::from(cidr.network()));
        let end = parent_end(cidr, base);
        let mut cursor = base;
        let mut subnets = Vec::with_capacity(tiers.len() * usize::from(zone_count));
        for tier in tiers {
            validate_tier_prefix(tier, cidr.prefix_len())?;
            for zone_index in 0..zone_count {
                let (subnet, next_cursor) =
                    allocate_subnet(cidr, tier, zone_index, cursor, end)?;
                subnets.push(subnet);
                cursor = next_cursor;
            }
        }

        Ok(Self {
            cidr,
            zone_count,
            subnets,
            service_gateways: Vec::new(),
        })
    }

    /// Adds an in-network service gateway (for example `object-storage`) so
    /// fleet-to-store traffic avoids the public internet. Builder-style;
    /// only meaningful before the plan is handed to a provider.
    #[must_use]
    pub fn with_service_gateway(mut self, service: impl Into<String>) -> Self {
        self.service_gateways.push(service.into().trim().to_owned());
        self
    }

    /// Parent address space of the plan.
    #[must_use]
    pub const fn cidr(&self) -> Ipv4Net {
        self.cidr
    }

    /// Number of availability zones each tier spans.
    #[must_use]
    pub const fn zone_count(&self) -> u8 {
        self.zone_count
    }

    /// Every allocated subnet, in allocation order.
    #[must_use]
    pub fn subnets(&self) -> &[SubnetPlan] {
        &self.subnets
    }

    /// Subnets in the public tier(s).
    #[must_use]
    pub fn public_subnets(&self) -> Vec<&SubnetPlan> {
        self.subnets_of_kind(TierKind::Public)
    }

    /// Subnets in the private tier(s).
    #[must_use]
    pub fn private_subnets(&self) -> Vec<&SubnetPlan> {
        self.subnets_of_kind(TierKind::PrivateWithEgress)
    }

    /// Requested in-network service gateways.
    #[must_use]
    pub fn service_gateways(&self) -> &[String] {
        &self.service_gateways
    }

    fn subnets_of_kind(&self, kind: TierKind) -> Vec<&SubnetPlan> {
        self.subnets
            .iter()
            .filter(|subnet| subnet.kind == kind)
            .collect()
    }
}

fn validate_tier_names(tiers: &[TierSpec]) -> Result<(), NetworkPlanError> {
    let mut seen = Vec::with_capacity(tiers.len());
    for tier in tiers {
        if tier.name.is_empty() || seen.contains(&tier.name.as_str()) {
            return Err(NetworkPlanError::InvalidTierName(tier.name.clone()));
        }
        seen.push(tier.name.as_str());
    }
    Ok(())
}

fn validate_tier_prefix(tier: &TierSpec, parent_prefix_len: u8) -> Result<(), NetworkPlanError> {
    if tier.prefix_len <= parent_prefix_len || tier.prefix_len > MAX_TIER_PREFIX_LEN {
        return Err(NetworkPlanError::PrefixOutOfRange {
            tier: tier.name.clone(),
            prefix_len: tier.prefix_len,
            parent_prefix_len,
        });
    }
    Ok(())
}

fn parent_end(cidr: Ipv4Net, base: u64) -> u64 {
    let host_bits = 32u32.saturating_sub(u32::from(cidr.prefix_len()));
    base.saturating_add(1u64 << host_bits)
}

fn allocate_subnet(
    cidr: Ipv4Net,
    tier: &TierSpec,
    zone_index: u8,
    cursor: u64,
    end: u64,
) -> Result<(SubnetPlan, u64), NetworkPlanError> {
    let exhausted = || NetworkPlanError::SpaceExhausted {
        cidr,
        tier: tier.name.clone(),
        zone_index,
    };

    let host_bits = 32u32.saturating_sub(u32::from(tier.prefix_len));
    let size = 1u64 << host_bits;
    let aligned = cursor.next_multiple_of(size);
    let next_cursor = aligned.saturating_add(size);
    if next_cursor > end {
        return Err(exhausted());
    }

    let address = u32::try_from(aligned).map_err(|_| exhausted())?;
    let subnet_cidr =
        Ipv4Net::new(Ipv4Addr::from(address), tier.prefix_len).map_err(|_| exhausted())?;

    Ok((
        SubnetPlan {
            tier_name: tier.name.clone(),
            kind: tier.kind,
            zone_index,
            cidr: subnet_cidr,
        },
        next_cursor,
    ))
}
