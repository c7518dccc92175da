use std::sync::Arc;

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use tessera_core::adapter::MemoryAdapter;
use tessera_core::model::{
    now_default, uuid4_default, ColumnDescriptor, ColumnSet, ModelSchema, ModelSchemaBuilder,
};
use tessera_core::Session;

/// Current time at whole-second precision, as stored by timestamp columns
#[allow(dead_code)]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

#[allow(dead_code)]
pub fn fixed_time(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .single()
        .unwrap()
}

#[allow(dead_code)]
fn todo_columns(builder: ModelSchemaBuilder) -> ModelSchemaBuilder {
    builder
        .column(ColumnDescriptor::text("title"))
        .column(ColumnDescriptor::text("text"))
        .column(ColumnDescriptor::boolean("done"))
        .column(ColumnDescriptor::timestamp("pub_date"))
}

/// Todo keyed by a generated uuid
#[allow(dead_code)]
pub fn todo_model() -> Arc<ModelSchema> {
    todo_columns(
        ModelSchema::builder("todo")
            .column(ColumnDescriptor::uuid("uuid").primary_key().default_with(uuid4_default())),
    )
    .build()
    .unwrap()
}

/// Todo whose uuid key has no default
#[allow(dead_code)]
pub fn no_default_todo_model() -> Arc<ModelSchema> {
    todo_columns(ModelSchema::builder("no_default_todo").column(ColumnDescriptor::uuid("uuid").primary_key()))
        .build()
        .unwrap()
}

/// Todo extending an abstract column set that contributes `base_text`
#[allow(dead_code)]
pub fn inherited_todo_model() -> Arc<ModelSchema> {
    let intermediate = ColumnSet::new("intermediate_todo").column(ColumnDescriptor::text("base_text"));
    todo_columns(
        ModelSchema::builder("inherited_todo")
            .extends(&intermediate)
            .column(ColumnDescriptor::uuid("uuid").primary_key().default_with(uuid4_default())),
    )
    .build()
    .unwrap()
}

/// Todo with a (partition, uuid, pub_date) composite key, all defaulted
#[allow(dead_code)]
pub fn multi_key_todo_model() -> Arc<ModelSchema> {
    ModelSchema::builder("multi_todo")
        .column(ColumnDescriptor::uuid("partition").primary_key().default_with(uuid4_default()))
        .column(ColumnDescriptor::uuid("uuid").primary_key().default_with(uuid4_default()))
        .column(ColumnDescriptor::text("title"))
        .column(ColumnDescriptor::text("text"))
        .column(ColumnDescriptor::boolean("done"))
        .column(ColumnDescriptor::timestamp("pub_date").primary_key().default_with(now_default()))
        .build()
        .unwrap()
}

/// Same composite key as [`multi_key_todo_model`] without any defaults
#[allow(dead_code)]
pub fn no_default_multi_key_todo_model() -> Arc<ModelSchema> {
    ModelSchema::builder("no_default_multi_todo")
        .column(ColumnDescriptor::uuid("partition").primary_key())
        .column(ColumnDescriptor::uuid("uuid").primary_key())
        .column(ColumnDescriptor::text("title"))
        .column(ColumnDescriptor::text("text"))
        .column(ColumnDescriptor::boolean("done"))
        .column(ColumnDescriptor::timestamp("pub_date").primary_key())
        .build()
        .unwrap()
}

/// Counter model keyed by (partition, cluster)
#[allow(dead_code)]
pub fn counter_model() -> Arc<ModelSchema> {
    ModelSchema::builder("counter_model")
        .column(ColumnDescriptor::uuid("partition").primary_key().default_with(uuid4_default()))
        .column(ColumnDescriptor::uuid("cluster").primary_key().default_with(uuid4_default()))
        .column(ColumnDescriptor::counter("counter"))
        .build()
        .unwrap()
}

/// Fresh session over a fresh in-memory adapter
#[allow(dead_code)]
pub fn new_session() -> (Session, Arc<MemoryAdapter>) {
    let adapter = Arc::new(MemoryAdapter::new());
    (Session::new(adapter.clone()), adapter)
}
