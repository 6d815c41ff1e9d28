use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, FnArg, ItemFn, Pat};

/// Time a navigation system or hot function when the `perf_stats` feature is enabled.
///
/// The generated guard logs through Bevy's `info!` when it is dropped at the
/// end of the function body. Without `perf_stats` the guard is compiled out and
/// the function is emitted unchanged.
///
/// # Tick-aware logging
/// If the function takes a parameter named `tick` whose type mentions
/// `NavTick`, the guard also reports every 100th tick regardless of duration,
/// so slow-but-steady systems still show up in the log.
///
/// # Example
/// ```ignore
/// #[profile(2)] // report when the body takes longer than 2ms
/// pub fn sync_obstacles(tick: Res<NavTick>, /* ... */) {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn profile(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let threshold_ms: u128 = if attr.is_empty() {
        1
    } else {
        attr.to_string().trim().parse().unwrap_or(1)
    };

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;
    let label = sig.ident.to_string();

    let takes_tick = sig.inputs.iter().any(|arg| {
        let FnArg::Typed(pat_type) = arg else {
            return false;
        };
        let Pat::Ident(pat_ident) = &*pat_type.pat else {
            return false;
        };
        let ty = &pat_type.ty;
        pat_ident.ident == "tick" && quote!(#ty).to_string().contains("NavTick")
    });

    let tick_field = if takes_tick {
        quote! { tick: Some(tick.0), }
    } else {
        quote! { tick: None, }
    };

    let output = quote! {
        #(#attrs)*
        #vis #sig {
            #[cfg(feature = "perf_stats")]
            let _profile_guard = {
                struct ProfileGuard {
                    label: &'static str,
                    started: std::time::Instant,
                    tick: Option<u64>,
                }
                impl Drop for ProfileGuard {
                    fn drop(&mut self) {
                        let elapsed = self.started.elapsed();
                        let periodic = self.tick.map_or(false, |t| t % 100 == 0);
                        if elapsed.as_millis() > #threshold_ms || periodic {
                            bevy::prelude::info!("[PERF] {}: {:?}", self.label, elapsed);
                        }
                    }
                }
                ProfileGuard {
                    label: #label,
                    started: std::time::Instant::now(),
                    #tick_field
                }
            };

            #block
        }
    };

    output.into()
}
