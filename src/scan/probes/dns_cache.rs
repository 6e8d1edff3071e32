//! DNS cache probe: keyword-matches resolver cache entries from
//! `ipconfig /displaydns`.

use async_trait::async_trait;

use crate::decode::dns_cache::parse_display_dns;
use crate::error::ScanError;
use crate::models::ScanGroup;
use crate::scan::context::ScanContext;
use crate::scan::progress::FindingSink;
use crate::scan::Scanner;

pub struct DnsCacheProbe;

impl DnsCacheProbe {
    fn process_output(&self, ctx: &ScanContext, out: &mut FindingSink, text: &str) {
        for name in parse_display_dns(text) {
            if let Some(keyword) = ctx.matcher.find_keyword(&name) {
                out.push(format!("cached lookup {name} (keyword: {keyword})"));
            }
        }
    }
}

#[async_trait]
impl Scanner for DnsCacheProbe {
    fn name(&self) -> &'static str {
        "DnsCache"
    }

    fn group(&self) -> ScanGroup {
        ScanGroup::Process
    }

    async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
        ctx.check_cancelled()?;
        out.progress(0, 1, "ipconfig /displaydns");
        let output = ctx.executor.run("ipconfig", &["/displaydns"]).await?;
        self.process_output(ctx, out, &output);
        out.progress(1, 1, "");
        Ok(())
    }
}
