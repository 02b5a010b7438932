use dagflow::{EngineBuilder, GraphEvent, RunOptions, WorkflowModel};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let engine = EngineBuilder::new().build().unwrap();

    let text = include_str!("./workflow.json");
    let workflow_model = WorkflowModel::from_json(text).unwrap();

    let report = engine.validate(&workflow_model);
    println!("Validation: {}", serde_json::to_string_pretty(&report).unwrap());

    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(msg) = events.recv().await {
            match &msg.event {
                GraphEvent::Workflow(ev) => println!("[{}] workflow {}", msg.run_id, ev.str()),
                GraphEvent::Node(ev) => println!("[{}] node {} {}", msg.run_id, msg.nid, ev.str()),
            }
        }
    });

    let run = engine.execute(&workflow_model, serde_json::json!({"query": "Will it rain in Paris tomorrow?"}), RunOptions::default()).await.unwrap();

    println!("Run {} finished: {}", run.id, run.state);
    println!("Outputs: {}", serde_json::to_string_pretty(&run.output()).unwrap());
}
