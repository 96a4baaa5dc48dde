// ==========================================
// Registry Ingest - entity descriptors
// ==========================================
// One static descriptor per entity type, in load order.
// Column caps follow the registry's published extract layout.
// ==========================================

use super::{EntitySchema, FieldSpec, ForeignKey, Identity, ParentRef, SoftReference};
use crate::domain::types::{ConflictPolicy, DedupPolicy, EntityType, KeyFormat};

const ENTERPRISE_PARENT: ParentRef = ParentRef {
    entity: EntityType::Enterprise,
    table: "enterprise",
    column: "enterprise_number",
};

const ESTABLISHMENT_PARENT: ParentRef = ParentRef {
    entity: EntityType::Establishment,
    table: "establishment",
    column: "establishment_number",
};

/// Activities, addresses, contacts and denominations hang off either
/// an enterprise or an establishment (same identifier space).
const ENTITY_PARENTS: &[ParentRef] = &[ENTERPRISE_PARENT, ESTABLISHMENT_PARENT];

const STATUS_VALUES: &[&str] = &["AC", "ST"];

// ==========================================
// Field lists
// ==========================================

const CODE_FIELDS: &[FieldSpec] = &[
    FieldSpec::key("Code", "code", None),
    FieldSpec::text("Category", "category", None),
    FieldSpec::text("Language", "language", None),
    FieldSpec::text("Description", "description", None),
];

const ENTERPRISE_FIELDS: &[FieldSpec] = &[
    FieldSpec::key("EnterpriseNumber", "enterprise_number", Some(15)),
    FieldSpec::text("Status", "status", Some(3)).one_of(STATUS_VALUES),
    FieldSpec::text("JuridicalSituation", "juridical_situation", Some(3)),
    FieldSpec::text("TypeOfEnterprise", "type_of_enterprise", Some(1)),
    FieldSpec::text("JuridicalForm", "juridical_form", Some(10)),
    FieldSpec::text("JuridicalFormCAC", "juridical_form_cac", Some(10)),
    FieldSpec::date("StartDate", "start_date"),
];

const ESTABLISHMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::key("EstablishmentNumber", "establishment_number", Some(15)),
    FieldSpec::date("StartDate", "start_date"),
    FieldSpec::key("EnterpriseNumber", "enterprise_number", Some(15)),
];

const ACTIVITY_FIELDS: &[FieldSpec] = &[
    FieldSpec::key("EntityNumber", "entity_number", Some(15)),
    FieldSpec::text("ActivityGroup", "activity_group", Some(10)),
    FieldSpec::text("NaceVersion", "nace_version", Some(10)),
    FieldSpec::text("NaceCode", "nace_code", Some(8)).required(),
    FieldSpec::text("Classification", "classification", Some(10)),
];

const ADDRESS_FIELDS: &[FieldSpec] = &[
    FieldSpec::key("EntityNumber", "entity_number", Some(15)),
    FieldSpec::text("TypeOfAddress", "type_of_address", Some(10)),
    FieldSpec::text("CountryFR", "country_fr", Some(100)),
    FieldSpec::text("Zipcode", "zipcode", Some(4)),
    FieldSpec::text("StreetFR", "street_fr", Some(200)),
    FieldSpec::text("HouseNumber", "house_number", Some(10)),
    FieldSpec::text("Box", "box", Some(10)),
    FieldSpec::date("DateStrikingOff", "date_striking_off"),
];

const CONTACT_FIELDS: &[FieldSpec] = &[
    FieldSpec::key("EntityNumber", "entity_number", Some(15)),
    FieldSpec::text("EntityContact", "entity_contact", Some(15)),
    FieldSpec::text("ContactType", "contact_type", Some(10)),
    FieldSpec::text("Value", "value", Some(200)),
];

const DENOMINATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::key("EntityNumber", "entity_number", Some(15)),
    FieldSpec::text("Language", "language", Some(2)),
    FieldSpec::text("TypeOfDenomination", "type_of_denomination", Some(10)),
    FieldSpec::text("Denomination", "denomination", Some(300)),
];

// ==========================================
// Descriptors (load order)
// ==========================================

pub(super) static SCHEMAS: [EntitySchema; 7] = [
    EntitySchema {
        entity: EntityType::Code,
        table: "code",
        file_name: "code.csv",
        key_index: 0,
        key_format: KeyFormat::Free,
        fields: CODE_FIELDS,
        identity: Identity::Natural,
        foreign_key: None,
        soft_refs: &[],
        conflict_policy: ConflictPolicy::Upsert,
        dedup_policy: DedupPolicy::KeepFirst,
    },
    EntitySchema {
        entity: EntityType::Enterprise,
        table: "enterprise",
        file_name: "enterprise.csv",
        key_index: 0,
        key_format: KeyFormat::EnterpriseNumber,
        fields: ENTERPRISE_FIELDS,
        identity: Identity::Natural,
        foreign_key: None,
        soft_refs: &[],
        conflict_policy: ConflictPolicy::Upsert,
        dedup_policy: DedupPolicy::KeepLast,
    },
    EntitySchema {
        entity: EntityType::Establishment,
        table: "establishment",
        file_name: "establishment.csv",
        key_index: 0,
        key_format: KeyFormat::EstablishmentNumber,
        fields: ESTABLISHMENT_FIELDS,
        identity: Identity::Natural,
        foreign_key: Some(ForeignKey {
            field_index: 2,
            parents: &[ENTERPRISE_PARENT],
        }),
        soft_refs: &[],
        conflict_policy: ConflictPolicy::Upsert,
        dedup_policy: DedupPolicy::KeepLast,
    },
    EntitySchema {
        entity: EntityType::Activity,
        table: "activity",
        file_name: "activity.csv",
        key_index: 0,
        key_format: KeyFormat::EntityNumber,
        fields: ACTIVITY_FIELDS,
        identity: Identity::Content,
        foreign_key: Some(ForeignKey {
            field_index: 0,
            parents: ENTITY_PARENTS,
        }),
        soft_refs: &[SoftReference {
            field_index: 3,
            table: "code",
            column: "code",
        }],
        conflict_policy: ConflictPolicy::Ignore,
        dedup_policy: DedupPolicy::KeepFirst,
    },
    EntitySchema {
        entity: EntityType::Address,
        table: "address",
        file_name: "address.csv",
        key_index: 0,
        key_format: KeyFormat::EntityNumber,
        fields: ADDRESS_FIELDS,
        identity: Identity::Content,
        foreign_key: Some(ForeignKey {
            field_index: 0,
            parents: ENTITY_PARENTS,
        }),
        soft_refs: &[],
        conflict_policy: ConflictPolicy::Ignore,
        dedup_policy: DedupPolicy::KeepFirst,
    },
    EntitySchema {
        entity: EntityType::Contact,
        table: "contact",
        file_name: "contact.csv",
        key_index: 0,
        key_format: KeyFormat::EntityNumber,
        fields: CONTACT_FIELDS,
        identity: Identity::Content,
        foreign_key: Some(ForeignKey {
            field_index: 0,
            parents: ENTITY_PARENTS,
        }),
        soft_refs: &[],
        conflict_policy: ConflictPolicy::Ignore,
        dedup_policy: DedupPolicy::KeepFirst,
    },
    EntitySchema {
        entity: EntityType::Denomination,
        table: "denomination",
        file_name: "denomination.csv",
        key_index: 0,
        key_format: KeyFormat::EntityNumber,
        fields: DENOMINATION_FIELDS,
        identity: Identity::Content,
        foreign_key: Some(ForeignKey {
            field_index: 0,
            parents: ENTITY_PARENTS,
        }),
        soft_refs: &[],
        conflict_policy: ConflictPolicy::Ignore,
        dedup_policy: DedupPolicy::KeepFirst,
    },
];
