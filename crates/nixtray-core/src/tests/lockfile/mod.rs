mod differ;
