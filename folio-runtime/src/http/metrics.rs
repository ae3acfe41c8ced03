use actix_web::{get, web, HttpResponse};
use folio_scheduler::metric;
use prometheus::{Encoder, Registry, TextEncoder};

/// Scheduler collectors, exported next to the default process collectors.
pub struct SchedulerMetrics {
    registry: Registry,
}

impl SchedulerMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        registry.register(Box::new(metric::job_dispatch_count_metric().clone()))?;
        registry.register(Box::new(metric::job_terminal_count_metric().clone()))?;
        registry.register(Box::new(metric::interpreter_death_count_metric().clone()))?;
        registry.register(Box::new(metric::cycle_duration_metric().clone()))?;

        Ok(Self { registry })
    }

    pub fn render(&self) -> anyhow::Result<String> {
        let mut families = self.registry.gather();
        families.extend(prometheus::gather());

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

#[get("/metrics")]
async fn scrape(metrics: web::Data<SchedulerMetrics>) -> HttpResponse {
    match metrics.render() {
        Ok(body) => HttpResponse::Ok()
            .content_type(TextEncoder::new().format_type())
            .body(body),
        Err(e) => {
            tracing::error!("could not render metrics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(scrape);
}
