use anyhow::Result;
use tracing::error;

use evs_core::{evs_error, evs_info, evs_println};
use evs_messages::{msg, MESSAGES};
use evs_vcenter::VCenterClient;
use vcf_evs::table;

use super::{AppContext, Outcome};

pub fn handle_vms(ctx: &AppContext) -> Result<Outcome> {
    let mut client = match VCenterClient::new(ctx.config.vmware(), &ctx.log) {
        Ok(client) => client.with_cancellation(ctx.cancel.clone()),
        Err(e) => {
            evs_error!("{}", msg!(MESSAGES.vms_failed, error = e));
            return Ok(Outcome::Failed);
        }
    };

    let listed = client.connect().and_then(|()| client.list_vms());
    client.disconnect();

    let vms = match listed {
        Ok(vms) => vms,
        Err(e) => {
            error!("Listing VMs failed: {}", e);
            evs_error!("{}", msg!(MESSAGES.vms_failed, error = e));
            return Ok(Outcome::Failed);
        }
    };

    if vms.is_empty() {
        evs_info!("{}", msg!(MESSAGES.vms_empty, server = client.server()));
        return Ok(Outcome::Success);
    }

    evs_println!("{}", msg!(MESSAGES.vms_header, server = client.server()));
    evs_println!();
    print!("{}", table::vm_table(&vms));
    Ok(Outcome::Success)
}
