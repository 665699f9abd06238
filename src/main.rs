use anyhow::{Result, anyhow};
use aws_config::ConfigLoader;
use aws_lambda_events::s3::{S3Bucket, S3Entity, S3Event, S3EventRecord, S3Object};
use aws_sdk_sfn::config::Region;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::debug;
use uploadtrigger::{Config, Trigger, set_up_logger};

#[derive(Debug)]
struct Args {
    verbose: bool,
    region: Option<String>,
    state_machine_arn: Option<String>,
    bucket: String,
    key: String,
}

fn command() -> Command {
    Command::new("UploadTrigger")
        .version("0.1")
        .author("Jacob Luszcz")
        .about("Starts a state machine execution for an uploaded S3 object.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Verbose mode. Outputs DEBUG and higher log messages."),
        )
        .arg(
            Arg::new("region")
                .short('r')
                .long("region")
                .help("AWS region. Defaults to the region of the AWS environment."),
        )
        .arg(
            Arg::new("state-machine-arn")
                .short('s')
                .long("state-machine-arn")
                .help("State machine ARN. Defaults to $STATE_MACHINE_ARN."),
        )
        .arg(
            Arg::new("bucket")
                .short('b')
                .long("bucket")
                .required(true)
                .help("S3 bucket name."),
        )
        .arg(
            Arg::new("key")
                .short('k')
                .long("key")
                .required(true)
                .help("S3 key name."),
        )
}

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| anyhow!("Missing argument: {name}"))
}

fn parse_args(matches: &ArgMatches) -> Result<Args> {
    Ok(Args {
        verbose: matches.get_flag("verbose"),
        region: matches.get_one::<String>("region").cloned(),
        state_machine_arn: matches.get_one::<String>("state-machine-arn").cloned(),
        bucket: required(matches, "bucket")?,
        key: required(matches, "key")?,
    })
}

impl From<&Args> for S3Event {
    fn from(args: &Args) -> Self {
        S3Event {
            records: vec![S3EventRecord {
                aws_region: args.region.clone(),
                event_source: Some("aws:s3".to_string()),
                event_name: Some("ObjectCreated:Put".to_string()),
                s3: S3Entity {
                    bucket: S3Bucket {
                        name: Some(args.bucket.clone()),
                        ..Default::default()
                    },
                    object: S3Object {
                        key: Some(args.key.clone()),
                        ..Default::default()
                    },
                    ..Default::default()
                },
                ..Default::default()
            }],
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(&command().get_matches())?;
    set_up_logger(module_path!(), args.verbose)?;
    debug!("Args: {args:?}");

    let config = match &args.state_machine_arn {
        Some(state_machine_arn) => Config::new(state_machine_arn),
        None => Config::from_env()?,
    };

    let mut config_loader = ConfigLoader::default();
    if let Some(region) = &args.region {
        config_loader = config_loader.region(Region::new(region.clone()));
    }
    let aws_config = config_loader.load().await;

    let trigger = Trigger::new(aws_sdk_sfn::Client::new(&aws_config), config);
    let started = trigger.trigger(&(&args).into()).await?;

    println!("{}", serde_json::to_string_pretty(&started)?);

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_command() {
        command().debug_assert();
    }

    #[test]
    fn test_parse_args() -> Result<()> {
        let matches = command().try_get_matches_from([
            "main", "-v", "-b", "uploads", "-k", "file1.csv", "-r", "eu-central-1",
        ])?;
        let args = parse_args(&matches)?;

        assert!(args.verbose);
        assert_eq!(Some("eu-central-1"), args.region.as_deref());
        assert_eq!(None, args.state_machine_arn);
        assert_eq!("uploads", args.bucket);
        assert_eq!("file1.csv", args.key);

        Ok(())
    }

    #[test]
    fn test_parse_args_missing_key() {
        let res = command().try_get_matches_from(["main", "-b", "uploads"]);

        assert!(res.is_err());
    }

    #[test]
    fn test_event_from_args() -> Result<()> {
        let args = Args {
            verbose: false,
            region: None,
            state_machine_arn: Some(
                "arn:aws:states:eu-central-1:123456789012:stateMachine:myMachine".to_string(),
            ),
            bucket: "uploads".to_string(),
            key: "file1.csv".to_string(),
        };

        let event: S3Event = (&args).into();
        let inputs = Trigger::workflow_inputs(&event)?;

        assert_eq!(1, inputs.len());
        assert_eq!("uploads", inputs[0].bucket);
        assert_eq!("file1.csv", inputs[0].key);

        Ok(())
    }
}
