pub use sea_orm_migration::prelude::*;

mod m20240402_101500_create_folio_job_batch_table;
mod m20240402_101812_create_folio_job_table;
mod m20240402_102240_create_folio_job_payload_table;
mod m20240402_102617_create_folio_job_result_table;
mod m20240409_093054_create_folio_interpreter_option_table;
mod m20240416_081530_create_folio_schedule_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240402_101500_create_folio_job_batch_table::Migration),
            Box::new(m20240402_101812_create_folio_job_table::Migration),
            Box::new(m20240402_102240_create_folio_job_payload_table::Migration),
            Box::new(m20240402_102617_create_folio_job_result_table::Migration),
            Box::new(m20240409_093054_create_folio_interpreter_option_table::Migration),
            Box::new(m20240416_081530_create_folio_schedule_table::Migration),
        ]
    }
}
