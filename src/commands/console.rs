//! Interactive operator console
//!
//! Reads lines from stdin and feeds them through the session layer: a line
//! starting with `/` is a menu action, anything else is text for the current
//! prompt.

use crate::cli::args::ConsoleArgs;
use crate::commands::AppContext;
use crate::domain::OperatorId;
use crate::error::{AppError, Result};
use crate::session::{stream_metrics, Actions, InboundEvent, Session, Step, METRICS_REFRESH};

use tokio::io::{AsyncBufReadExt, BufReader};

const MENU: &str = "\
Actions:
  /alerts:cpu /alerts:ram /alerts:disk     set a threshold
  /alerts:interval /alerts:cooldown        timing
  /alerts:services                         watched services
  /fw:open /fw:close /fw:ban /fw:safe-ports /fwp:panic
  /admins:add /admins:remove
  /sys:kill /sys:metrics /sys:metrics:stop
  /logs:unit /logs:search
  /dock:info /dock:containers /dock:images /dock:logs
  /dock:set_compose /dock:compose_ps /dock:compose_up /dock:compose_down /dock:compose_pull
  /bpro:list /bpro:create /bpro:restore /bpro:delete
  /term /term:exit /cancel
  /help /quit";

/// Execute the console command
pub async fn run_console(ctx: &AppContext, args: &ConsoleArgs) -> Result<()> {
    let operator = match args.operator {
        Some(id) => id,
        None => ctx.base_ids().first().copied().ok_or(AppError::NoAdmins)?,
    };

    let sampler = ctx.sampler();
    let session = ctx.session();
    let actions = ctx.actions(sampler.clone());

    println!("hostwarden console as operator {}\n{}", operator, MENU);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => {
                println!("{}", MENU);
                continue;
            }
            _ => {}
        }

        let event = to_event(operator, line);
        match session.handle(&event).await {
            Step::WatchMetrics => {
                let sampler = sampler.clone();
                session
                    .tasks()
                    .register(operator, move |token| {
                        stream_metrics(sampler, METRICS_REFRESH, token, |frame| {
                            println!("{}\n", frame)
                        })
                    })
                    .await;
            }
            step => println!("{}", render_step(&actions, step).await),
        }
    }

    session.shutdown().await;
    Ok(())
}

/// Map a console line to an inbound event
pub fn to_event(operator: OperatorId, line: &str) -> InboundEvent {
    match line.strip_prefix('/') {
        Some(data) => InboundEvent::Callback {
            actor: operator,
            chat: operator,
            data: data.to_string(),
        },
        None => InboundEvent::Text {
            actor: operator,
            chat: operator,
            text: line.to_string(),
        },
    }
}

async fn render_step(actions: &Actions, step: Step) -> String {
    match step {
        Step::Denied(reason) => reason.to_string(),
        Step::Prompt(prompt) => prompt,
        Step::Retry { error, prompt } => format!("Error: {}\n{}", error, prompt),
        Step::Run(intent) => match actions.execute(intent).await {
            Ok(text) => text,
            Err(e) => format!("Error: {}", e),
        },
        Step::Cancelled { .. } => "Cancelled".to_string(),
        Step::MetricsStopped { .. } => "Live metrics stopped".to_string(),
        Step::WatchMetrics => "Live metrics started".to_string(),
    }
}
