// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

#![allow(dead_code)]

use pollset::{Kind, Pollset};

/// run `f` once on a fresh pollset of every backend the host has
pub fn each_backend<T, F>(mut f: F)
where
    F: FnMut(Pollset<T>),
{
    for kind in Kind::available() {
        let set = Pollset::with_backend(kind).unwrap();
        assert_eq!(set.kind(), kind);
        println!("[{}]", kind);
        f(set);
    }
}
