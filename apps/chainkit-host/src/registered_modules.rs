// Links every module crate so its `submit_module!` entry reaches inventory.
// Maintained by hand: add a line when a crate is added under ./modules.
#![allow(unused_imports)]

use backend_server as _;
use evm_network as _;
