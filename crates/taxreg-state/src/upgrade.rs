//! # Upgrade Gate
//!
//! Authorizes replacement of the logic operating over the persisted state.
//! Persisted entities never move: an upgrade swaps the active
//! [`LogicDescriptor`] and appends an [`UpgradeRecord`].
//!
//! ## Compatibility contract
//!
//! A target is accepted only when, in order:
//!
//! 1. it exposes a migration entry point equal to [`MIGRATION_ENTRY_SLOT`];
//! 2. its version is strictly greater than the active version;
//! 3. its [`StorageLayout`] extends the active layout: every entity still
//!    present at its position, every field at its position with the same
//!    name and type, additions appended only.
//!
//! The Super-Admin check precedes all of them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use taxreg_core::{sha256_digest, Address, CanonicalBytes, CanonicalizationError, ContentDigest, Timestamp};

use crate::error::{IncompatibleTarget, InvariantViolation, LedgerError};
use crate::role::{Role, RoleManager};

/// The migration entry point a compatible logic revision exposes:
/// SHA-256 over the canonical bytes of `"taxreg.logic.migration-entry.v1"`.
pub const MIGRATION_ENTRY_SLOT: ContentDigest = ContentDigest::from_bytes([
    0x1f, 0x92, 0x1f, 0x4c, 0x67, 0xad, 0x7f, 0x65, 0xf0, 0x16, 0x10, 0xc5, 0xda, 0x24, 0xb2, 0x4c,
    0x03, 0x6f, 0x01, 0xba, 0x47, 0x0a, 0x54, 0x91, 0xa9, 0x48, 0xff, 0x24, 0xe3, 0x8e, 0x39, 0xde,
]);

/// Name of the logic shipped with this crate.
pub const BUILTIN_LOGIC_NAME: &str = "taxreg-ledger";

// ---------------------------------------------------------------------------
// Storage layout
// ---------------------------------------------------------------------------

/// One persisted field: name and declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// One persisted entity with its fields in storage order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLayout {
    pub name: String,
    pub fields: Vec<FieldLayout>,
}

/// Ordered description of every persisted entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    pub entities: Vec<EntityLayout>,
}

/// How a target layout fails to extend the active one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutViolation {
    /// A persisted entity is missing from the target.
    #[error("entity \"{entity}\" removed")]
    EntityRemoved {
        /// The missing entity.
        entity: String,
    },

    /// A persisted entity moved.
    #[error("entity \"{entity}\" moved from position {expected} to {found}")]
    EntityReordered {
        /// The moved entity.
        entity: String,
        /// Its persisted position.
        expected: usize,
        /// Its position in the target.
        found: usize,
    },

    /// A persisted field is missing from the target.
    #[error("field \"{entity}.{field}\" removed")]
    FieldRemoved {
        /// Owning entity.
        entity: String,
        /// The missing field.
        field: String,
    },

    /// A different field name occupies a persisted field's position.
    #[error("field {position} of \"{entity}\" renamed from \"{expected}\" to \"{found}\"")]
    FieldRenamed {
        /// Owning entity.
        entity: String,
        /// Field position.
        position: usize,
        /// Persisted name.
        expected: String,
        /// Target name.
        found: String,
    },

    /// A persisted field changed type.
    #[error("field \"{entity}.{field}\" retyped from {expected} to {found}")]
    FieldRetyped {
        /// Owning entity.
        entity: String,
        /// The retyped field.
        field: String,
        /// Persisted type.
        expected: String,
        /// Target type.
        found: String,
    },
}

fn entity(name: &str, fields: &[(&str, &str)]) -> EntityLayout {
    EntityLayout {
        name: name.to_string(),
        fields: fields
            .iter()
            .map(|(n, t)| FieldLayout {
                name: n.to_string(),
                ty: t.to_string(),
            })
            .collect(),
    }
}

impl StorageLayout {
    /// The layout of the entities defined in this crate.
    pub fn v1() -> Self {
        Self {
            entities: vec![
                entity("role_assignment", &[("address", "address"), ("roles", "role_set")]),
                entity(
                    "individual_profile",
                    &[
                        ("tin", "tin"),
                        ("id_number", "string"),
                        ("id_type", "string"),
                        ("first_name", "string"),
                        ("middle_name", "string"),
                        ("last_name", "string"),
                        ("date_of_birth", "string"),
                        ("phone", "string"),
                        ("email", "string"),
                        ("residential_address", "string"),
                        ("gender", "gender"),
                        ("is_active", "bool"),
                        ("registered_at", "timestamp"),
                        ("last_payment_date", "optional_timestamp"),
                    ],
                ),
                entity(
                    "business_profile",
                    &[
                        ("tin", "tin"),
                        ("registration_number", "string"),
                        ("company_name", "string"),
                        ("company_type", "string"),
                        ("registered_address", "string"),
                        ("operational_address", "string"),
                        ("email", "string"),
                        ("phone", "string"),
                        ("classification", "string"),
                        ("capital", "u128"),
                        ("is_active", "bool"),
                        ("registered_at", "timestamp"),
                        ("last_payment_date", "optional_timestamp"),
                    ],
                ),
                entity("tin_index", &[("tin", "tin"), ("address", "address")]),
                entity(
                    "tax_item",
                    &[
                        ("id", "tax_item_id"),
                        ("name", "string"),
                        ("description", "string"),
                        ("category", "tax_category"),
                        ("rate_bps", "basis_points"),
                        ("is_active", "bool"),
                        ("created_at", "timestamp"),
                        ("updated_at", "timestamp"),
                    ],
                ),
                entity(
                    "payment_record",
                    &[
                        ("id", "payment_id"),
                        ("payer", "address"),
                        ("tin", "tin"),
                        ("tax_item_id", "tax_item_id"),
                        ("amount", "u128"),
                        ("payment_reference", "string"),
                        ("receipt_reference", "string"),
                        ("timestamp", "timestamp"),
                        ("category", "tax_category"),
                    ],
                ),
                entity(
                    "payment_history",
                    &[("payer", "address"), ("payment_ids", "payment_id_list")],
                ),
            ],
        }
    }

    /// Append a field to `entity`, creating the entity at the end if absent.
    pub fn with_field(mut self, entity_name: &str, field: &str, ty: &str) -> Self {
        let new_field = FieldLayout {
            name: field.to_string(),
            ty: ty.to_string(),
        };
        match self.entities.iter_mut().find(|e| e.name == entity_name) {
            Some(e) => e.fields.push(new_field),
            None => self.entities.push(EntityLayout {
                name: entity_name.to_string(),
                fields: vec![new_field],
            }),
        }
        self
    }

    /// Append a new entity.
    pub fn with_entity(mut self, name: &str, fields: &[(&str, &str)]) -> Self {
        self.entities.push(entity(name, fields));
        self
    }

    /// Look up an entity by name.
    pub fn entity(&self, name: &str) -> Option<&EntityLayout> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Content digest of the layout.
    pub fn fingerprint(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&CanonicalBytes::new(self)?))
    }

    /// Check that `target` keeps every entity and field of `self` in place.
    pub fn check_extension(&self, target: &StorageLayout) -> Result<(), LayoutViolation> {
        for (pos, persisted) in self.entities.iter().enumerate() {
            let found = target
                .entities
                .iter()
                .position(|e| e.name == persisted.name)
                .ok_or_else(|| LayoutViolation::EntityRemoved {
                    entity: persisted.name.clone(),
                })?;
            if found != pos {
                return Err(LayoutViolation::EntityReordered {
                    entity: persisted.name.clone(),
                    expected: pos,
                    found,
                });
            }
            let candidate = &target.entities[found];
            for (position, field) in persisted.fields.iter().enumerate() {
                let Some(other) = candidate.fields.get(position) else {
                    return Err(LayoutViolation::FieldRemoved {
                        entity: persisted.name.clone(),
                        field: field.name.clone(),
                    });
                };
                if other.name != field.name {
                    return Err(LayoutViolation::FieldRenamed {
                        entity: persisted.name.clone(),
                        position,
                        expected: field.name.clone(),
                        found: other.name.clone(),
                    });
                }
                if other.ty != field.ty {
                    return Err(LayoutViolation::FieldRetyped {
                        entity: persisted.name.clone(),
                        field: field.name.clone(),
                        expected: field.ty.clone(),
                        found: other.ty.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Logic descriptor
// ---------------------------------------------------------------------------

/// Describes one revision of the logic operating over persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicDescriptor {
    pub name: String,
    pub version: u32,
    /// Migration entry point, `None` when the revision exposes none.
    #[serde(default)]
    pub migration_entry: Option<ContentDigest>,
    pub layout: StorageLayout,
}

impl LogicDescriptor {
    /// The logic shipped with this crate: version 1 over [`StorageLayout::v1`].
    pub fn builtin() -> Self {
        Self {
            name: BUILTIN_LOGIC_NAME.to_string(),
            version: 1,
            migration_entry: Some(MIGRATION_ENTRY_SLOT),
            layout: StorageLayout::v1(),
        }
    }

    /// Fail unless this revision exposes the compatible migration entry.
    pub fn check_migration_entry(&self) -> Result<(), IncompatibleTarget> {
        match self.migration_entry {
            None => Err(IncompatibleTarget::MissingMigrationEntry {
                logic: self.name.clone(),
                version: self.version,
            }),
            Some(found) if found != MIGRATION_ENTRY_SLOT => {
                Err(IncompatibleTarget::MigrationEntryMismatch {
                    expected: MIGRATION_ENTRY_SLOT,
                    found,
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Whether this revision can operate over state persisted under `layout`.
    pub fn check_interprets(&self, layout: &StorageLayout) -> Result<(), IncompatibleTarget> {
        self.check_migration_entry()?;
        layout.check_extension(&self.layout)?;
        Ok(())
    }

    /// Whether `target` may replace this revision.
    pub fn check_successor(&self, target: &LogicDescriptor) -> Result<(), IncompatibleTarget> {
        target.check_migration_entry()?;
        if target.version <= self.version {
            return Err(IncompatibleTarget::VersionNotIncreasing {
                active: self.version,
                target: target.version,
            });
        }
        self.layout.check_extension(&target.layout)?;
        Ok(())
    }
}

impl Default for LogicDescriptor {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// One authorized logic replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeRecord {
    pub from_version: u32,
    pub to_version: u32,
    /// Name of the logic now active.
    pub logic: String,
    pub authorized_by: Address,
    pub timestamp: Timestamp,
}

/// The active logic and the history of upgrades that led to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeGate {
    active: LogicDescriptor,
    history: Vec<UpgradeRecord>,
}

impl UpgradeGate {
    /// Start with `logic` active and an empty history.
    pub fn new(logic: LogicDescriptor) -> Result<Self, IncompatibleTarget> {
        logic.check_migration_entry()?;
        Ok(Self {
            active: logic,
            history: Vec::new(),
        })
    }

    /// Rebuild a gate from persisted parts.
    pub fn from_parts(active: LogicDescriptor, history: Vec<UpgradeRecord>) -> Self {
        Self { active, history }
    }

    /// Authorize `target` as the active logic.
    pub fn authorize(
        &mut self,
        roles: &RoleManager,
        caller: &Address,
        target: LogicDescriptor,
        now: Timestamp,
    ) -> Result<&UpgradeRecord, LedgerError> {
        roles.require_role(Role::SuperAdmin, caller)?;
        self.active.check_successor(&target)?;
        let record = UpgradeRecord {
            from_version: self.active.version,
            to_version: target.version,
            logic: target.name.clone(),
            authorized_by: *caller,
            timestamp: now,
        };
        self.active = target;
        self.history.push(record);
        let index = self.history.len() - 1;
        Ok(&self.history[index])
    }

    pub fn active_logic(&self) -> &LogicDescriptor {
        &self.active
    }

    /// Authorized upgrades, oldest first.
    pub fn upgrade_history(&self) -> &[UpgradeRecord] {
        &self.history
    }

    /// Check that the history is a strictly increasing chain of versions
    /// ending at the active logic.
    ///
    /// An empty history is accepted for any active version, since a
    /// registry may be configured to start above the builtin revision.
    pub fn check_consistency(&self) -> Result<(), InvariantViolation> {
        let broken = |position, reason| InvariantViolation::UpgradeChain { position, reason };
        for (position, record) in self.history.iter().enumerate() {
            if record.to_version <= record.from_version {
                return Err(broken(position, "version does not increase"));
            }
            if let Some(previous) = position.checked_sub(1).map(|i| &self.history[i]) {
                if record.from_version != previous.to_version {
                    return Err(broken(position, "does not start where the previous ended"));
                }
            }
        }
        if let Some(last) = self.history.last() {
            let position = self.history.len() - 1;
            if last.to_version != self.active.version {
                return Err(broken(position, "does not end at the active version"));
            }
            if last.logic != self.active.name {
                return Err(broken(position, "names logic other than the active one"));
            }
        }
        Ok(())
    }
}
