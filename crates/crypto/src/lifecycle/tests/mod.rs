// Copyright (C) Microsoft Corporation. All rights reserved.



pub(crate) use mock::*;

use super::*;
