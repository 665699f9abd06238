use aws_lambda_events::s3::S3Event;
use lambda_runtime::{LambdaEvent, service_fn};
use log::info;
use std::error::Error;
use uploadtrigger::{Config, Response, Trigger, set_up_logger, verbose_from_env};

type LambdaError = Box<dyn Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    set_up_logger(module_path!(), verbose_from_env())?;

    let config = Config::from_env()?;
    info!("State Machine: {}", config.state_machine_arn);

    let aws_config = aws_config::load_from_env().await;
    let trigger = Trigger::new(aws_sdk_sfn::Client::new(&aws_config), config);

    let func = service_fn(|event| function(event, &trigger));
    lambda_runtime::run(func).await?;
    Ok(())
}

async fn function(event: LambdaEvent<S3Event>, trigger: &Trigger) -> Result<Response, LambdaError> {
    Ok(trigger.handle(&event.payload).await?)
}
